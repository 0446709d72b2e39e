//! Aggregate function state blobs and their `create`/`add`/`merge`/`finalize`
//! contract. Kept tagged-enum rather than `dyn Trait` for the
//! same reason `Column` is, and because the two specialized
//! states (`quantileTiming`, HyperLogLog `uniq`) aren't trivially boxed
//! behind one vtable shape.

use crate::aggregation::hyperloglog::HyperLogLog;
use crate::aggregation::quantile_timing::QuantileTimingState;
use crate::column::Field;
use crate::error::{EngineError, EngineResult, ErrorCode};

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateState {
    Count(u64),
    Sum(f64),
    Avg { sum: f64, count: u64 },
    Min(Option<Field>),
    Max(Option<Field>),
    QuantileTiming(QuantileTimingState),
    Uniq(HyperLogLog),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateFunctionKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    /// `level` as a percentage in `[0, 1]`.
    QuantileTiming(f64),
    Uniq,
}

impl AggregateFunctionKind {
    pub fn create_state(self) -> AggregateState {
        match self {
            AggregateFunctionKind::Count => AggregateState::Count(0),
            AggregateFunctionKind::Sum => AggregateState::Sum(0.0),
            AggregateFunctionKind::Avg => AggregateState::Avg { sum: 0.0, count: 0 },
            AggregateFunctionKind::Min => AggregateState::Min(None),
            AggregateFunctionKind::Max => AggregateState::Max(None),
            AggregateFunctionKind::QuantileTiming(_) => AggregateState::QuantileTiming(QuantileTimingState::new()),
            AggregateFunctionKind::Uniq => AggregateState::Uniq(HyperLogLog::new()),
        }
    }

    pub fn add(self, state: &mut AggregateState, value: &Field) -> EngineResult<()> {
        match (self, state) {
            (AggregateFunctionKind::Count, AggregateState::Count(c)) => *c += 1,
            (AggregateFunctionKind::Sum, AggregateState::Sum(s)) => {
                *s += value.as_f64().ok_or_else(|| EngineError::new(ErrorCode::TypeMismatch, "sum: non-numeric value"))?
            }
            (AggregateFunctionKind::Avg, AggregateState::Avg { sum, count }) => {
                *sum += value.as_f64().ok_or_else(|| EngineError::new(ErrorCode::TypeMismatch, "avg: non-numeric value"))?;
                *count += 1;
            }
            (AggregateFunctionKind::Min, AggregateState::Min(m)) => {
                if m.as_ref().map(|cur| value.compare(cur, true).is_lt()).unwrap_or(true) {
                    *m = Some(value.clone());
                }
            }
            (AggregateFunctionKind::Max, AggregateState::Max(m)) => {
                if m.as_ref().map(|cur| value.compare(cur, false).is_gt()).unwrap_or(true) {
                    *m = Some(value.clone());
                }
            }
            (AggregateFunctionKind::QuantileTiming(_), AggregateState::QuantileTiming(q)) => {
                let v = value.as_f64().ok_or_else(|| EngineError::new(ErrorCode::TypeMismatch, "quantileTiming: non-numeric value"))?;
                q.insert(v.max(0.0) as u32);
            }
            (AggregateFunctionKind::Uniq, AggregateState::Uniq(h)) => match value {
                Field::String(s) => h.insert(s),
                other => h.insert(&format!("{other:?}")),
            },
            _ => return Err(EngineError::logical("aggregate function/state kind mismatch")),
        }
        Ok(())
    }

    pub fn merge(self, state: &mut AggregateState, other: &AggregateState) -> EngineResult<()> {
        match (self, state, other) {
            (AggregateFunctionKind::Count, AggregateState::Count(a), AggregateState::Count(b)) => *a += b,
            (AggregateFunctionKind::Sum, AggregateState::Sum(a), AggregateState::Sum(b)) => *a += b,
            (AggregateFunctionKind::Avg, AggregateState::Avg { sum: s1, count: c1 }, AggregateState::Avg { sum: s2, count: c2 }) => {
                *s1 += s2;
                *c1 += c2;
            }
            (AggregateFunctionKind::Min, AggregateState::Min(a), AggregateState::Min(b)) => {
                if let Some(bv) = b {
                    if a.as_ref().map(|av| bv.compare(av, true).is_lt()).unwrap_or(true) {
                        *a = Some(bv.clone());
                    }
                }
            }
            (AggregateFunctionKind::Max, AggregateState::Max(a), AggregateState::Max(b)) => {
                if let Some(bv) = b {
                    if a.as_ref().map(|av| bv.compare(av, false).is_gt()).unwrap_or(true) {
                        *a = Some(bv.clone());
                    }
                }
            }
            (AggregateFunctionKind::QuantileTiming(_), AggregateState::QuantileTiming(a), AggregateState::QuantileTiming(b)) => a.merge(b),
            (AggregateFunctionKind::Uniq, AggregateState::Uniq(a), AggregateState::Uniq(b)) => a.merge(b),
            _ => return Err(EngineError::logical("aggregate function/state kind mismatch during merge")),
        }
        Ok(())
    }

    pub fn finalize(self, state: &AggregateState) -> Field {
        match (self, state) {
            (AggregateFunctionKind::Count, AggregateState::Count(c)) => Field::UInt64(*c),
            (AggregateFunctionKind::Sum, AggregateState::Sum(s)) => Field::Float64(*s),
            (AggregateFunctionKind::Avg, AggregateState::Avg { sum, count }) => {
                Field::Float64(if *count == 0 { f64::NAN } else { sum / *count as f64 })
            }
            (AggregateFunctionKind::Min, AggregateState::Min(m)) => m.clone().unwrap_or(Field::Null),
            (AggregateFunctionKind::Max, AggregateState::Max(m)) => m.clone().unwrap_or(Field::Null),
            (AggregateFunctionKind::QuantileTiming(level), AggregateState::QuantileTiming(q)) => Field::Float64(q.get(level)),
            (AggregateFunctionKind::Uniq, AggregateState::Uniq(h)) => Field::UInt64(h.estimate().round() as u64),
            _ => Field::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_ignores_value_payload() {
        let kind = AggregateFunctionKind::Count;
        let mut state = kind.create_state();
        for _ in 0..5 {
            kind.add(&mut state, &Field::Null).unwrap();
        }
        assert_eq!(kind.finalize(&state), Field::UInt64(5));
    }

    #[test]
    fn sum_accumulates_numeric_values() {
        let kind = AggregateFunctionKind::Sum;
        let mut state = kind.create_state();
        for v in [1u64, 2, 3] {
            kind.add(&mut state, &Field::UInt64(v)).unwrap();
        }
        assert_eq!(kind.finalize(&state), Field::Float64(6.0));
    }

    #[test]
    fn merge_associativity_for_sum() {
        // finalize(merge(state(G1), merge(state(G2), state(G3)))) == finalize(state(G1∪G2∪G3))
        let kind = AggregateFunctionKind::Sum;
        let groups: [&[u64]; 3] = [&[1, 2], &[3], &[4, 5, 6]];
        let mut combined = kind.create_state();
        for g in &groups {
            for &v in *g {
                kind.add(&mut combined, &Field::UInt64(v)).unwrap();
            }
        }

        let mut s1 = kind.create_state();
        for &v in groups[0] {
            kind.add(&mut s1, &Field::UInt64(v)).unwrap();
        }
        let mut s2 = kind.create_state();
        for &v in groups[1] {
            kind.add(&mut s2, &Field::UInt64(v)).unwrap();
        }
        let mut s3 = kind.create_state();
        for &v in groups[2] {
            kind.add(&mut s3, &Field::UInt64(v)).unwrap();
        }
        kind.merge(&mut s2, &s3).unwrap();
        kind.merge(&mut s1, &s2).unwrap();

        assert_eq!(kind.finalize(&s1), kind.finalize(&combined));
    }
}
