//! Deferred callback scheduling.
//!
//! Passive effects never run inline. They are handed to a [`Scheduler`],
//! which runs them once before the next render pass or when an update
//! forces a flush.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// A callback queued to run before the next render pass.
pub type ScheduledCallback = Box<dyn FnOnce()>;

/// Collaborator that owns the "before next render" queue.
pub trait Scheduler {
    /// Queue `callback` to run once before the next render pass.
    fn schedule_before_next_render(&self, callback: ScheduledCallback);

    /// Run every queued callback now. Must be safe to call at any time,
    /// including when nothing is queued.
    fn flush_passive_effects(&self);
}

/// FIFO implementation of [`Scheduler`].
///
/// Callbacks queued while a flush is running are picked up by the same
/// flush. A flush started from inside a callback returns immediately.
#[derive(Default)]
pub struct PassiveEffectQueue {
    queue: RefCell<VecDeque<ScheduledCallback>>,
    flushing: Cell<bool>,
}

impl PassiveEffectQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting to run.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether nothing is waiting to run.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

impl Scheduler for PassiveEffectQueue {
    fn schedule_before_next_render(&self, callback: ScheduledCallback) {
        self.queue.borrow_mut().push_back(callback);
    }

    fn flush_passive_effects(&self) {
        if self.flushing.replace(true) {
            return;
        }
        let _flushing = FlushGuard(&self.flushing);

        let mut ran = 0usize;
        loop {
            // Release the borrow before running so callbacks can enqueue.
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(callback) => {
                    callback();
                    ran += 1;
                }
                None => break,
            }
        }

        if ran > 0 {
            tracing::trace!(ran, "flushed passive effects");
        }
    }
}

/// Clears the flushing flag when dropped, including on unwind.
struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
