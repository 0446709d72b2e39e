//! Profiling wrapper: timers, row/byte counters, and limit enforcement.
//!
//! A stream decorator so any `BlockInputStream` gets counters and limits
//! for free.

use std::time::{Duration, Instant};

use crate::block::DataBlock;
use crate::error::{EngineError, ErrorCode, EngineResult};
use crate::pipeline::stream::BlockInputStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowMode {
    Throw,
    Break,
}

#[derive(Debug, Clone, Default)]
pub struct Limits {
    pub max_rows_to_read: Option<u64>,
    pub max_bytes_to_read: Option<u64>,
    pub max_execution_time: Option<Duration>,
    /// (min rows/sec, warm-up duration) — speed is only checked afterward.
    pub min_execution_speed: Option<(f64, Duration)>,
    pub overflow_mode: OverflowModeOrDefault,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OverflowModeOrDefault(pub Option<OverflowMode>);

impl OverflowModeOrDefault {
    fn resolve(self) -> OverflowMode {
        self.0.unwrap_or(OverflowMode::Throw)
    }
}

pub struct ProfilingStream<S> {
    inner: S,
    limits: Limits,
    start: Instant,
    rows_read: u64,
    bytes_read: u64,
    blocks_read: u64,
}

impl<S: BlockInputStream> ProfilingStream<S> {
    pub fn new(inner: S, limits: Limits) -> Self {
        Self { inner, limits, start: Instant::now(), rows_read: 0, bytes_read: 0, blocks_read: 0 }
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn check_limits(&self) -> EngineResult<bool> {
        let mode = self.limits.overflow_mode.resolve();
        if let Some(max_rows) = self.limits.max_rows_to_read {
            if self.rows_read > max_rows {
                return match mode {
                    OverflowMode::Throw => Err(EngineError::new(ErrorCode::TooManyRows, format!("read {} rows, limit {max_rows}", self.rows_read))),
                    OverflowMode::Break => Ok(false),
                };
            }
        }
        if let Some(max_bytes) = self.limits.max_bytes_to_read {
            if self.bytes_read > max_bytes {
                return match mode {
                    OverflowMode::Throw => Err(EngineError::new(ErrorCode::TooManyRows, format!("read {} bytes, limit {max_bytes}", self.bytes_read))),
                    OverflowMode::Break => Ok(false),
                };
            }
        }
        if let Some(max_time) = self.limits.max_execution_time {
            if self.elapsed() > max_time {
                return Err(EngineError::new(ErrorCode::TimeoutExceeded, format!("execution exceeded {max_time:?}")));
            }
        }
        if let Some((min_speed, warmup)) = self.limits.min_execution_speed {
            let elapsed = self.elapsed();
            if elapsed > warmup {
                let speed = self.rows_read as f64 / elapsed.as_secs_f64().max(1e-9);
                if speed < min_speed {
                    return Err(EngineError::new(ErrorCode::TimeoutExceeded, format!("execution speed {speed:.1} rows/s below minimum {min_speed:.1}")));
                }
            }
        }
        Ok(true)
    }
}

impl<S: BlockInputStream> BlockInputStream for ProfilingStream<S> {
    fn read(&mut self) -> EngineResult<DataBlock> {
        let block = self.inner.read()?;
        if block.is_empty() {
            return Ok(block);
        }
        self.rows_read += block.rows() as u64;
        self.bytes_read += block.byte_size() as u64;
        self.blocks_read += 1;
        if !self.check_limits()? {
            return Ok(DataBlock::new());
        }
        Ok(block)
    }

    fn read_prefix(&mut self) -> EngineResult<()> {
        self.start = Instant::now();
        self.inner.read_prefix()
    }

    fn read_suffix(&mut self) -> EngineResult<()> {
        self.inner.read_suffix()
    }

    fn cancel(&self) {
        self.inner.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::NamedColumn;
    use crate::column::{Column, DataType, Field, PodArray};

    struct Repeating {
        remaining: usize,
        row_count: usize,
    }
    impl BlockInputStream for Repeating {
        fn read(&mut self) -> EngineResult<DataBlock> {
            if self.remaining == 0 {
                return Ok(DataBlock::new());
            }
            self.remaining -= 1;
            let mut c = Column::UInt64(PodArray::new());
            for i in 0..self.row_count {
                c.insert_field(Field::UInt64(i as u64)).unwrap();
            }
            DataBlock::from_columns(vec![NamedColumn { name: "x".into(), data_type: DataType::UInt64, column: c }])
        }
    }

    #[test]
    fn throw_mode_raises_too_many_rows() {
        let limits = Limits { max_rows_to_read: Some(5), overflow_mode: OverflowModeOrDefault(Some(OverflowMode::Throw)), ..Default::default() };
        let mut stream = ProfilingStream::new(Repeating { remaining: 10, row_count: 3 }, limits);
        let mut err = None;
        for _ in 0..10 {
            if let Err(e) = stream.read() {
                err = Some(e);
                break;
            }
        }
        assert_eq!(err.unwrap().code, ErrorCode::TooManyRows);
    }

    #[test]
    fn break_mode_returns_eos_cleanly() {
        let limits = Limits { max_rows_to_read: Some(5), overflow_mode: OverflowModeOrDefault(Some(OverflowMode::Break)), ..Default::default() };
        let mut stream = ProfilingStream::new(Repeating { remaining: 10, row_count: 3 }, limits);
        let mut blocks = 0;
        loop {
            let b = stream.read().unwrap();
            if b.is_empty() {
                break;
            }
            blocks += 1;
        }
        assert_eq!(blocks, 2); // 3 + 3 = 6 > 5 on the 2nd block, breaks there
    }
}
