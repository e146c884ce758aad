//! Minimum-cost alignment of two sequences
//!
//! Classic edit-distance table with a caller-supplied substitution cost. The
//! caller's `get_change` decides whether two elements are the same (`None`)
//! or how expensive turning one into the other is (`Some(change)`).

pub const DELETION_COST: u32 = 1;
pub const INSERTION_COST: u32 = 1;

/// Price of a substitution in the alignment table
pub trait Cost {
    fn cost(&self) -> u32;
}

/// One step of an edit script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation<T, C> {
    Equal { original: T, updated: T },
    Insert { updated: T },
    /// An insertion after every original element
    Append { updated: T },
    Delete { original: T },
    Change(C),
}

impl<T, C> Operation<T, C> {
    pub fn is_equal(&self) -> bool {
        matches!(self, Operation::Equal { .. })
    }

    pub fn is_append(&self) -> bool {
        matches!(self, Operation::Append { .. })
    }
}

enum Step<C> {
    Origin,
    Delete,
    Insert,
    Equal,
    Change(C),
}

struct Cell<C> {
    total: u32,
    step: Step<C>,
}

/// Compute the cheapest edit script turning `a` into `b`.
///
/// Ties prefer matching or substituting over deleting, and deleting over
/// inserting. The first error returned by `get_change` aborts the alignment.
///
/// # Errors
///
/// Propagates any error returned by `get_change`.
pub fn levenshtein<T, C, E, F>(a: &[T], b: &[T], mut get_change: F) -> Result<Vec<Operation<T, C>>, E>
where
    T: Clone,
    C: Cost,
    F: FnMut(&T, &T) -> Result<Option<C>, E>,
{
    let width = b.len() + 1;
    let mut table: Vec<Cell<C>> = Vec::with_capacity((a.len() + 1) * width);

    for i in 0..=a.len() {
        for j in 0..=b.len() {
            let cell = if i == 0 && j == 0 {
                Cell {
                    total: 0,
                    step: Step::Origin,
                }
            } else if i == 0 {
                Cell {
                    total: table[j - 1].total + INSERTION_COST,
                    step: Step::Insert,
                }
            } else if j == 0 {
                Cell {
                    total: table[(i - 1) * width].total + DELETION_COST,
                    step: Step::Delete,
                }
            } else {
                let change = get_change(&a[i - 1], &b[j - 1])?;
                let diagonal = table[(i - 1) * width + (j - 1)].total;
                let substitution = diagonal + change.as_ref().map_or(0, Cost::cost);
                let deletion = table[(i - 1) * width + j].total + DELETION_COST;
                let insertion = table[i * width + (j - 1)].total + INSERTION_COST;

                if substitution <= deletion && substitution <= insertion {
                    Cell {
                        total: substitution,
                        step: change.map_or(Step::Equal, Step::Change),
                    }
                } else if deletion <= insertion {
                    Cell {
                        total: deletion,
                        step: Step::Delete,
                    }
                } else {
                    Cell {
                        total: insertion,
                        step: Step::Insert,
                    }
                }
            };
            table.push(cell);
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (a.len(), b.len());
    loop {
        let step = std::mem::replace(&mut table[i * width + j].step, Step::Origin);
        match step {
            Step::Origin => break,
            Step::Delete => {
                ops.push(Operation::Delete {
                    original: a[i - 1].clone(),
                });
                i -= 1;
            }
            Step::Insert => {
                let updated = b[j - 1].clone();
                ops.push(if i == a.len() {
                    Operation::Append { updated }
                } else {
                    Operation::Insert { updated }
                });
                j -= 1;
            }
            Step::Equal => {
                ops.push(Operation::Equal {
                    original: a[i - 1].clone(),
                    updated: b[j - 1].clone(),
                });
                i -= 1;
                j -= 1;
            }
            Step::Change(change) => {
                ops.push(Operation::Change(change));
                i -= 1;
                j -= 1;
            }
        }
    }

    ops.reverse();
    Ok(ops)
}
