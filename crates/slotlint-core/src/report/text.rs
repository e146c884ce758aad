//! Plain-text layout helpers for report rendering

/// Indent every line of `text`: the first by `first_line` spaces, the rest by `amount`.
pub fn indent(text: &str, amount: usize, first_line: usize) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            let width = if i == 0 { first_line } else { amount };
            format!("{}{}", " ".repeat(width), line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bulleted list with `-` bullets
pub fn itemize<S: AsRef<str>>(items: &[S]) -> String {
    itemize_with("-", items)
}

/// Bulleted list; continuation lines of an item are aligned under its text
pub fn itemize_with<S: AsRef<str>>(bullet: &str, items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", bullet, indent(item.as_ref(), 2, 1)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// ANSI styling switch
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub use_color: bool,
}

impl Style {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    pub fn bold(&self) -> &'static str {
        if self.use_color {
            "\x1b[1m"
        } else {
            ""
        }
    }

    pub fn normal(&self) -> &'static str {
        if self.use_color {
            "\x1b[22m"
        } else {
            ""
        }
    }
}
