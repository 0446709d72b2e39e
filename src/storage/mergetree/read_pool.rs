//! Read pool: hands fixed-cost tasks to worker threads.
//!
//! `getTask` picks the part at `size-1-(size*thread/threads)` for cache
//! locality, trims its mark-range tail by up to `min_marks`, and returns it
//! whole if fewer than `min_marks` remain. Tail consumption is
//! swap-and-pop, so ordering is deterministic given the input but not
//! stable across the vector.

use std::sync::Mutex;

use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::storage::mergetree::part::Part;

#[derive(Debug, Clone)]
pub struct MarkRange {
    pub begin: usize,
    pub end: usize,
}

impl MarkRange {
    pub fn len(&self) -> usize {
        self.end - self.begin
    }
}

#[derive(Debug, Clone)]
pub struct ReadTask {
    pub part_index: usize,
    pub ranges: Vec<MarkRange>,
    pub columns: Vec<String>,
    pub pre_columns: Vec<String>,
    pub should_reorder: bool,
    pub remove_prewhere_column: bool,
}

struct PartState {
    part: Part,
    ranges: Vec<MarkRange>,
}

pub struct ReadPool {
    parts: Mutex<Vec<PartState>>,
    columns: Vec<String>,
    pre_columns: Vec<String>,
    remove_prewhere_column: bool,
}

impl ReadPool {
    pub fn new(parts: Vec<(Part, Vec<MarkRange>)>, columns: Vec<String>, pre_columns: Vec<String>, remove_prewhere_column: bool) -> Self {
        let parts = parts.into_iter().map(|(part, ranges)| PartState { part, ranges }).collect();
        Self { parts: Mutex::new(parts), columns, pre_columns, remove_prewhere_column }
    }

    /// Returns `None` once every part's ranges are exhausted.
    pub fn get_task(&self, min_marks: usize, thread_id: usize, num_threads: usize) -> EngineResult<Option<ReadTask>> {
        if num_threads == 0 {
            return Err(EngineError::new(ErrorCode::ParameterOutOfBound, "num_threads must be > 0"));
        }
        let mut parts = self.parts.lock().map_err(|_| EngineError::logical("read pool mutex poisoned"))?;
        if parts.is_empty() {
            return Ok(None);
        }
        let size = parts.len();
        let preferred = size.saturating_sub(1).saturating_sub(size * thread_id / num_threads);
        let idx = Self::pick_non_empty(&parts, preferred);
        let Some(idx) = idx else { return Ok(None) };

        let (should_inject, inject_names) = self.decide_injection(&parts[idx].part);
        let mut taken = Vec::new();
        let total_remaining: usize = parts[idx].ranges.iter().map(MarkRange::len).sum();

        if total_remaining <= min_marks {
            // Invariant: a part left with fewer than min_marks remaining is taken whole.
            taken = std::mem::take(&mut parts[idx].ranges);
        } else {
            let mut to_take = min_marks;
            while to_take > 0 {
                if let Some(last) = parts[idx].ranges.last_mut() {
                    let take_here = last.len().min(to_take);
                    taken.push(MarkRange { begin: last.end - take_here, end: last.end });
                    last.end -= take_here;
                    to_take -= take_here;
                    if last.len() == 0 {
                        parts[idx].ranges.pop(); // swap-and-pop semantics: drop the drained tail range
                    }
                } else {
                    break;
                }
            }
        }

        let part_fully_drained = parts[idx].ranges.is_empty();
        let part_index = idx;
        if part_fully_drained {
            parts.swap_remove(idx);
        }

        let mut columns = self.columns.clone();
        for name in inject_names {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }

        Ok(Some(ReadTask {
            part_index,
            ranges: taken,
            columns,
            pre_columns: self.pre_columns.clone(),
            should_reorder: should_inject,
            remove_prewhere_column: self.remove_prewhere_column,
        }))
    }

    fn pick_non_empty(parts: &[PartState], preferred: usize) -> Option<usize> {
        if parts.is_empty() {
            return None;
        }
        let preferred = preferred.min(parts.len() - 1);
        if !parts[preferred].ranges.is_empty() {
            return Some(preferred);
        }
        parts.iter().position(|p| !p.ranges.is_empty())
    }

    /// Default-value injection. Two cases:
    /// - some but not all requested columns are missing (an `ALTER ADD
    ///   COLUMN` predating this part): inject the columns each missing
    ///   column's DEFAULT expression depends on, and reorder.
    /// - no requested column has a file at all: inject the smallest column
    ///   by `.bin + .mrk` size just to provide a row count.
    fn decide_injection(&self, part: &Part) -> (bool, Vec<String>) {
        let missing: Vec<&String> = self.columns.iter().filter(|c| !part.has_column(c)).collect();
        if missing.is_empty() {
            return (false, Vec::new());
        }
        if missing.len() == self.columns.len() {
            return (true, part.smallest_column().map(str::to_string).into_iter().collect());
        }
        let mut inject = Vec::new();
        for name in missing {
            for dep in part.default_dependencies_for(name) {
                if !inject.contains(dep) {
                    inject.push(dep.clone());
                }
            }
        }
        (true, inject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::DataType;
    use std::path::PathBuf;

    fn fake_part(name: &str, marks: usize) -> (Part, Vec<MarkRange>) {
        use crate::storage::mergetree::part::PartName;
        let part = Part {
            name: PartName { partition: "p".into(), min_block: 0, max_block: 0, level: 0, mutation: None },
            path: PathBuf::from(name),
            columns: vec![("v".into(), DataType::UInt64)],
            rows_count: (marks * 8192) as u64,
            marks_count: marks as u64,
            column_byte_size: vec![("v".into(), 1024)],
            default_dependencies: vec![],
        };
        (part, vec![MarkRange { begin: 0, end: marks }])
    }

    #[test]
    fn part_with_fewer_than_min_marks_is_taken_whole() {
        let pool = ReadPool::new(vec![fake_part("a", 3)], vec!["v".into()], vec![], false);
        let task = pool.get_task(10, 0, 1).unwrap().unwrap();
        assert_eq!(task.ranges.iter().map(MarkRange::len).sum::<usize>(), 3);
        assert!(pool.get_task(10, 0, 1).unwrap().is_none());
    }

    #[test]
    fn large_part_is_trimmed_by_min_marks_per_call() {
        let pool = ReadPool::new(vec![fake_part("a", 100)], vec!["v".into()], vec![], false);
        let first = pool.get_task(10, 0, 1).unwrap().unwrap();
        assert_eq!(first.ranges.iter().map(MarkRange::len).sum::<usize>(), 10);
        let second = pool.get_task(10, 0, 1).unwrap().unwrap();
        assert_eq!(second.ranges.iter().map(MarkRange::len).sum::<usize>(), 10);
    }

    #[test]
    fn partially_missing_column_injects_its_default_dependencies_and_reorders() {
        use crate::storage::mergetree::part::PartName;
        let part = Part {
            name: PartName { partition: "p".into(), min_block: 0, max_block: 0, level: 0, mutation: None },
            path: PathBuf::from("a"),
            columns: vec![("v".into(), DataType::UInt64), ("base".into(), DataType::UInt64)],
            rows_count: 8192,
            marks_count: 1,
            column_byte_size: vec![("v".into(), 1024), ("base".into(), 512)],
            default_dependencies: vec![("added".to_string(), vec!["base".to_string()])],
        };
        let pool = ReadPool::new(vec![(part, vec![MarkRange { begin: 0, end: 1 }])], vec!["v".into(), "added".into()], vec![], false);
        let task = pool.get_task(10, 0, 1).unwrap().unwrap();
        assert!(task.should_reorder);
        assert!(task.columns.contains(&"base".to_string()));
    }

    #[test]
    fn part_missing_every_requested_column_injects_smallest_column_only() {
        let pool = ReadPool::new(vec![fake_part("a", 3)], vec!["missing".into()], vec![], false);
        let task = pool.get_task(10, 0, 1).unwrap().unwrap();
        assert!(task.should_reorder);
        assert!(task.columns.contains(&"v".to_string()));
    }
}
