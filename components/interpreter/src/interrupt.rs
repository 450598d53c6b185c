//! Host-requested interruption of running script.
//!
//! The interpreter polls the flag at safepoints (loop back-edges, calls and
//! returns), so a request takes effect at the next such point.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const NONE: u8 = 0;
const CATCHABLE: u8 = 1;
const TERMINATE: u8 = 2;

/// What a pending interrupt turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    /// Throw `Error("Execution interrupted")`; script may catch it.
    Catchable,
    /// Abort with `FatalError::Terminated`, skipping all handlers.
    Terminate,
}

/// Cloneable, thread-safe trigger for interrupting a runtime.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicU8>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the runtime to stop at its next safepoint. A terminate request
    /// is never downgraded by a later catchable one.
    pub fn request(&self, mode: InterruptMode) {
        let value = match mode {
            InterruptMode::Catchable => CATCHABLE,
            InterruptMode::Terminate => TERMINATE,
        };
        self.flag.fetch_max(value, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.flag.load(Ordering::Relaxed) != NONE
    }

    /// Consume the pending request, if any.
    pub(crate) fn take(&self) -> Option<InterruptMode> {
        if self.flag.load(Ordering::Relaxed) == NONE {
            return None;
        }
        match self.flag.swap(NONE, Ordering::SeqCst) {
            CATCHABLE => Some(InterruptMode::Catchable),
            TERMINATE => Some(InterruptMode::Terminate),
            _ => None,
        }
    }

    pub fn clear(&self) {
        self.flag.store(NONE, Ordering::SeqCst);
    }
}
