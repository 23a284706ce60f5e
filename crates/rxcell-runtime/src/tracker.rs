#![forbid(unsafe_code)]

//! Ambient evaluation-scope stack for automatic dependency collection.
//!
//! While a derivation runs, every cell it reads reports itself here via
//! [`record_read`]. The tracker keeps a thread-local stack of frames, one
//! per in-flight evaluation, so nested derivations each collect their own
//! dependency set: a read lands in the innermost frame only, and the
//! finished computed cell then reports *itself* to the enclosing frame.
//!
//! The stack has an explicit lifecycle: [`with_frame`] pushes a frame,
//! runs the closure, and pops the frame even on unwind. Outside any frame,
//! `record_read` is a no-op, so plain reads from application code cost one
//! thread-local check.

use std::cell::RefCell;

use crate::cell::SourceHandle;

#[derive(Default)]
struct Frame {
    reads: Vec<SourceHandle>,
}

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Whether an evaluation frame is currently active.
#[cfg(test)]
pub(crate) fn is_tracking() -> bool {
    FRAMES.with(|frames| !frames.borrow().is_empty())
}

/// Current evaluation nesting depth.
#[cfg(test)]
pub(crate) fn depth() -> usize {
    FRAMES.with(|frames| frames.borrow().len())
}

/// Record a cell read into the innermost frame, if any. Each cell appears
/// at most once per frame.
pub(crate) fn record_read(source: &SourceHandle) {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        if let Some(top) = frames.last_mut()
            && !top.reads.iter().any(|seen| seen.same_cell(source))
        {
            top.reads.push(source.clone());
        }
    });
}

/// Pops on drop so a panicking derivation cannot leave a stale frame.
struct FrameGuard {
    armed: bool,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if self.armed {
            FRAMES.with(|frames| {
                frames.borrow_mut().pop();
            });
        }
    }
}

/// Run `f` under a fresh evaluation frame and return its output together
/// with the set of cells read while it ran.
pub(crate) fn with_frame<T>(f: impl FnOnce() -> T) -> (T, Vec<SourceHandle>) {
    FRAMES.with(|frames| frames.borrow_mut().push(Frame::default()));
    let mut guard = FrameGuard { armed: true };
    let output = f();
    guard.armed = false;
    let reads = FRAMES
        .with(|frames| frames.borrow_mut().pop())
        .map(|frame| frame.reads)
        .unwrap_or_default();
    (output, reads)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
