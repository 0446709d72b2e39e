//! Primary-key condition: a reverse-polish expression over
//! `{IN_RANGE, NOT_IN_RANGE, IN_SET, AND, OR, NOT, UNKNOWN}` built from a
//! typed `Predicate` tree, evaluated against a candidate PK tuple range to
//! decide whether a granule can be pruned.
//!
//! The external WHERE/PREWHERE AST that would normally produce a
//! `Predicate` is out of scope (no SQL parser here); `Predicate` is the
//! internal representation a planner would build from it.

use crate::column::Field;

#[derive(Debug, Clone)]
pub enum Predicate {
    InRange { column: String, min: Option<Field>, max: Option<Field> },
    InSet { column: String, values: Vec<Field> },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    /// A predicate over a non-PK column, or one too complex to reason
    /// about: conservatively neither provable true nor provable false.
    Unknown,
}

#[derive(Debug, Clone)]
pub enum RpnElement {
    InRange { column: String, min: Option<Field>, max: Option<Field> },
    NotInRange { column: String, min: Option<Field>, max: Option<Field> },
    InSet { column: String, values: Vec<Field> },
    And,
    Or,
    Not,
    Unknown,
}

pub struct PkCondition {
    rpn: Vec<RpnElement>,
}

impl PkCondition {
    pub fn build(predicate: &Predicate) -> Self {
        let mut rpn = Vec::new();
        Self::emit(predicate, &mut rpn);
        Self { rpn }
    }

    fn emit(predicate: &Predicate, out: &mut Vec<RpnElement>) {
        match predicate {
            Predicate::InRange { column, min, max } => {
                out.push(RpnElement::InRange { column: column.clone(), min: min.clone(), max: max.clone() })
            }
            Predicate::InSet { column, values } => out.push(RpnElement::InSet { column: column.clone(), values: values.clone() }),
            Predicate::And(a, b) => {
                Self::emit(a, out);
                Self::emit(b, out);
                out.push(RpnElement::And);
            }
            Predicate::Or(a, b) => {
                Self::emit(a, out);
                Self::emit(b, out);
                out.push(RpnElement::Or);
            }
            Predicate::Not(inner) => {
                // A negated bare range collapses to NotInRange directly
                // rather than InRange+Not, matching the RPN element set
                // named above.
                if let Predicate::InRange { column, min, max } = inner.as_ref() {
                    out.push(RpnElement::NotInRange { column: column.clone(), min: min.clone(), max: max.clone() });
                } else {
                    Self::emit(inner, out);
                    out.push(RpnElement::Not);
                }
            }
            Predicate::Unknown => out.push(RpnElement::Unknown),
        }
    }

    /// Evaluates over a candidate PK column range `[left, right]` (per
    /// column named in the predicate). Returns `(can_be_true, can_be_false)`;
    /// `can_be_true=false` means the planner may discard the granule.
    pub fn evaluate(&self, candidate: &[(String, Field, Field)]) -> (bool, bool) {
        let lookup = |col: &str| candidate.iter().find(|(c, _, _)| c == col).map(|(_, l, r)| (l, r));

        let mut stack: Vec<(bool, bool)> = Vec::new();
        for el in &self.rpn {
            let result = match el {
                RpnElement::InRange { column, min, max } => match lookup(column) {
                    Some((left, right)) => range_overlap(left, right, min, max),
                    None => (true, true),
                },
                RpnElement::NotInRange { column, min, max } => match lookup(column) {
                    Some((left, right)) => {
                        let (t, f) = range_overlap(left, right, min, max);
                        (f, t)
                    }
                    None => (true, true),
                },
                RpnElement::InSet { column, values } => match lookup(column) {
                    Some((left, right)) => {
                        let any_in_range = values.iter().any(|v| v.compare(left, false).is_ge() && v.compare(right, false).is_le());
                        let any_out_of_range = left.compare(right, false) != std::cmp::Ordering::Equal || !values.iter().any(|v| *v == *left);
                        (any_in_range, any_out_of_range)
                    }
                    None => (true, true),
                },
                RpnElement::And => {
                    let b = stack.pop().unwrap_or((true, true));
                    let a = stack.pop().unwrap_or((true, true));
                    (a.0 && b.0, a.1 || b.1)
                }
                RpnElement::Or => {
                    let b = stack.pop().unwrap_or((true, true));
                    let a = stack.pop().unwrap_or((true, true));
                    (a.0 || b.0, a.1 && b.1)
                }
                RpnElement::Not => {
                    let a = stack.pop().unwrap_or((true, true));
                    (a.1, a.0)
                }
                RpnElement::Unknown => (true, true),
            };
            if !matches!(el, RpnElement::And | RpnElement::Or | RpnElement::Not) {
                stack.push(result);
            } else {
                stack.push(result);
            }
        }
        stack.pop().unwrap_or((true, true))
    }
}

/// Whether `[left, right]` can overlap, and can fail to be fully contained
/// in, `[min, max]` (either bound `None` meaning unbounded).
fn range_overlap(left: &Field, right: &Field, min: &Option<Field>, max: &Option<Field>) -> (bool, bool) {
    let above_min = min.as_ref().map(|m| right.compare(m, false).is_ge()).unwrap_or(true);
    let below_max = max.as_ref().map(|m| left.compare(m, false).is_le()).unwrap_or(true);
    let can_be_true = above_min && below_max;

    let fully_above_min = min.as_ref().map(|m| left.compare(m, false).is_ge()).unwrap_or(true);
    let fully_below_max = max.as_ref().map(|m| right.compare(m, false).is_le()).unwrap_or(true);
    let can_be_false = !(fully_above_min && fully_below_max);

    (can_be_true, can_be_false)
}
