//! Block input stream trait.
//!
//! A pull-based `read()` loop: a stream is never re-entered concurrently,
//! so `&mut self` is enough — no interior mutability is required here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::block::DataBlock;
use crate::error::EngineResult;

/// A node in the pull-based dataflow DAG. `read()` returning an empty block
/// signals end-of-stream.
pub trait BlockInputStream: Send {
    fn read(&mut self) -> EngineResult<DataBlock>;

    /// One-shot initialization hook, called once before the first `read()`.
    fn read_prefix(&mut self) -> EngineResult<()> {
        Ok(())
    }

    /// One-shot teardown hook, called once after the stream returns EOS.
    fn read_suffix(&mut self) -> EngineResult<()> {
        Ok(())
    }

    /// Idempotent, thread-safe cancellation. Default no-op; composite
    /// streams override to propagate to children.
    fn cancel(&self) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A cancellation token shared between a stream and anything (a remote
/// connection handler, a UI "stop query" button) that needs to abort it.
/// `cancel()` is compare-and-set so repeated calls are harmless.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) -> bool {
        // compare_exchange so the "first canceller" can tell it actually
        // transitioned the flag, matching this module's idempotence requirement.
        self.0.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a tree of streams to completion, running `read()` until EOS,
/// invoking `on_block` for each non-empty block. Root-level helper used by
/// interpreters; not itself part of the stream trait.
pub fn drain<S: BlockInputStream + ?Sized>(stream: &mut S, mut on_block: impl FnMut(DataBlock)) -> EngineResult<()> {
    stream.read_prefix()?;
    loop {
        let block = stream.read()?;
        if block.is_empty() {
            break;
        }
        on_block(block);
    }
    stream.read_suffix()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_is_idempotent() {
        let tok = CancellationToken::new();
        assert!(!tok.is_cancelled());
        assert!(tok.cancel());
        assert!(tok.is_cancelled());
        assert!(!tok.cancel(), "second cancel should report no transition");
    }

    struct CountingStream {
        remaining: usize,
    }
    impl BlockInputStream for CountingStream {
        fn read(&mut self) -> EngineResult<DataBlock> {
            if self.remaining == 0 {
                return Ok(DataBlock::new());
            }
            self.remaining -= 1;
            let mut c = crate::column::Column::UInt64(crate::column::PodArray::new());
            c.insert_field(crate::column::Field::UInt64(1)).unwrap();
            DataBlock::from_columns(vec![crate::block::NamedColumn {
                name: "x".into(),
                data_type: crate::column::DataType::UInt64,
                column: c,
            }])
        }
    }

    #[test]
    fn drain_stops_at_empty_block() {
        let mut s = CountingStream { remaining: 3 };
        let mut count = 0;
        drain(&mut s, |_| count += 1).unwrap();
        assert_eq!(count, 3);
    }
}
