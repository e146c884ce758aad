//! Parser for compiler type identifiers
//!
//! A type identifier has the shape `head(arg,arg,...)tail`, where arguments
//! are themselves type identifiers and the parenthesised group and tail are
//! optional:
//!
//! - `t_uint256`
//! - `t_mapping(t_address,t_uint256)`
//! - `t_array(t_uint256)49_storage`
//! - `t_struct(Pool)12_storage`

use crate::errors::{LayoutError, Result};

/// Components of one type identifier, arguments still unparsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTypeId {
    pub head: String,
    pub args: Option<Vec<String>>,
    pub tail: Option<String>,
}

/// Split a type identifier into head, top-level arguments and tail.
///
/// # Errors
///
/// - `MalformedTypeId` — empty identifier, empty head, or unbalanced parentheses
pub fn parse_type_id(type_id: &str) -> Result<ParsedTypeId> {
    let malformed = |reason: &str| LayoutError::MalformedTypeId {
        type_id: type_id.to_string(),
        reason: reason.to_string(),
    };

    if type_id.trim().is_empty() {
        return Err(malformed("identifier is empty"));
    }

    let open = match type_id.find('(') {
        Some(open) => open,
        None => {
            if type_id.contains(')') {
                return Err(malformed("unbalanced parentheses"));
            }
            return Ok(ParsedTypeId {
                head: type_id.to_string(),
                args: None,
                tail: None,
            });
        }
    };

    if open == 0 {
        return Err(malformed("missing head before argument list"));
    }

    let mut depth = 0usize;
    let mut start = open + 1;
    let mut args = Vec::new();
    let mut close = None;

    for (i, c) in type_id.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    args.push(&type_id[start..i]);
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => {
                args.push(&type_id[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    let close = close.ok_or_else(|| malformed("unbalanced parentheses"))?;

    // `()` means an empty argument list, not one empty argument
    if args.len() == 1 && args[0].is_empty() {
        args.clear();
    }
    if args.iter().any(|a| a.is_empty()) {
        return Err(malformed("empty argument"));
    }

    let tail = &type_id[close + 1..];

    Ok(ParsedTypeId {
        head: type_id[..open].to_string(),
        args: Some(args.into_iter().map(str::to_string).collect()),
        tail: (!tail.is_empty()).then(|| tail.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_type() {
        let parsed = parse_type_id("t_uint256").unwrap();
        assert_eq!(parsed.head, "t_uint256");
        assert_eq!(parsed.args, None);
        assert_eq!(parsed.tail, None);
    }

    #[test]
    fn test_mapping_args() {
        let parsed = parse_type_id("t_mapping(t_address,t_uint256)").unwrap();
        assert_eq!(parsed.head, "t_mapping");
        assert_eq!(
            parsed.args,
            Some(vec!["t_address".to_string(), "t_uint256".to_string()])
        );
        assert_eq!(parsed.tail, None);
    }

    #[test]
    fn test_nested_args_split_at_top_level_only() {
        let parsed =
            parse_type_id("t_mapping(t_uint256,t_mapping(t_address,t_bool))").unwrap();
        assert_eq!(
            parsed.args,
            Some(vec![
                "t_uint256".to_string(),
                "t_mapping(t_address,t_bool)".to_string()
            ])
        );
    }

    #[test]
    fn test_array_tail() {
        let parsed = parse_type_id("t_array(t_uint256)49_storage").unwrap();
        assert_eq!(parsed.head, "t_array");
        assert_eq!(parsed.tail.as_deref(), Some("49_storage"));
    }

    #[test]
    fn test_struct_name_is_argument() {
        let parsed = parse_type_id("t_struct(Pool)12_storage").unwrap();
        assert_eq!(parsed.args, Some(vec!["Pool".to_string()]));
        assert_eq!(parsed.tail.as_deref(), Some("12_storage"));
    }

    #[test]
    fn test_function_with_empty_args_keeps_return_tail() {
        let parsed = parse_type_id("t_function_internal_nonpayable()returns(t_bool)").unwrap();
        assert_eq!(parsed.head, "t_function_internal_nonpayable");
        assert_eq!(parsed.args, Some(vec![]));
        assert_eq!(parsed.tail.as_deref(), Some("returns(t_bool)"));
    }

    #[test]
    fn test_malformed_identifiers() {
        for bad in ["", "t_mapping(t_address", "(t_uint256)", "t_uint256)", "t_x(a,,b)"] {
            let err = parse_type_id(bad).unwrap_err();
            assert!(
                matches!(err, LayoutError::MalformedTypeId { .. }),
                "expected malformed error for {:?}",
                bad
            );
        }
    }
}
