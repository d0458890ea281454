//! The render context shared by hooks, updaters and effects.
//!
//! A [`Runtime`] tracks what is executing right now as a stack of frames:
//!
//! - a *render* frame for every instance whose render function is running,
//! - an *effect* frame for every effect body or cleanup that is running.
//!
//! The instance of the innermost render frame is the "currently rendering
//! instance"; hooks and updaters compare themselves against it. Any frame at
//! all means "rendering", which suppresses nested passive-effect flushes.
//! Frames are pushed through guards and popped on every exit path, so a
//! nested render or effect always hands back exactly the state it found.

use crate::config::EngineConfig;
use crate::error::{HookError, Result};
use crate::hooks::Hooks;
use crate::instance::Instance;
use crate::scheduler::{PassiveEffectQueue, ScheduledCallback, Scheduler};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub(crate) enum Frame {
    Render(Instance),
    Effect,
}

struct RuntimeInner {
    frames: RefCell<Vec<Frame>>,
    scheduler: Rc<dyn Scheduler>,
    config: EngineConfig,
}

/// Shared handle to the render context.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime that defers passive effects through `scheduler`.
    pub fn new(scheduler: Rc<dyn Scheduler>, config: EngineConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                frames: RefCell::new(Vec::new()),
                scheduler,
                config,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// The instance whose render function is executing, if any.
    ///
    /// Returns `None` while an effect body runs, even when the effect was
    /// triggered from inside a render.
    pub fn current_instance(&self) -> Option<Instance> {
        match self.inner.frames.borrow().last() {
            Some(Frame::Render(instance)) => Some(instance.clone()),
            _ => None,
        }
    }

    /// Whether a render or an effect is executing.
    pub fn is_rendering(&self) -> bool {
        !self.inner.frames.borrow().is_empty()
    }

    pub(crate) fn is_rendering_instance(&self, instance: &Instance) -> bool {
        matches!(
            self.inner.frames.borrow().last(),
            Some(Frame::Render(current)) if current.ptr_eq(instance)
        )
    }

    pub(crate) fn enter(&self, frame: Frame) -> FrameGuard {
        let mut frames = self.inner.frames.borrow_mut();
        let depth = frames.len();
        frames.push(frame);
        FrameGuard {
            runtime: self.clone(),
            depth,
        }
    }

    /// Queue `callback` to run before the next render pass.
    pub fn schedule_before_next_render(&self, callback: ScheduledCallback) {
        self.inner.scheduler.schedule_before_next_render(callback);
    }

    /// Run every queued passive effect now.
    pub fn flush_passive_effects(&self) {
        self.inner.scheduler.flush_passive_effects();
    }

    /// Render `instance` by calling `render` with its hooks.
    ///
    /// When the render function updates its own state, the result is thrown
    /// away and the instance renders again with the new state, until a pass
    /// completes without such updates or the configured restart limit is hit.
    pub fn render<R>(
        &self,
        instance: &Instance,
        mut render: impl FnMut(&Hooks<'_>) -> Result<R>,
    ) -> Result<R> {
        let mut restarts = 0usize;
        loop {
            instance.begin_render();
            let output = {
                let _frame = self.enter(Frame::Render(instance.clone()));
                render(&Hooks::new(self, instance))
            }?;
            instance.end_render(self.inner.config.check_hook_order)?;

            if !instance.is_render_scheduled() {
                return Ok(output);
            }

            restarts += 1;
            if let Some(limit) = self.inner.config.max_render_restarts
                && restarts > limit
            {
                tracing::warn!(instance = %instance.id(), limit, "render restart limit reached");
                return Err(HookError::TooManyRenderRestarts { limit });
            }
            tracing::trace!(instance = %instance.id(), restarts, "restarting render after render-phase update");
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Rc::new(PassiveEffectQueue::new()), EngineConfig::default())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("depth", &self.inner.frames.borrow().len())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Pops a frame when dropped.
pub(crate) struct FrameGuard {
    runtime: Runtime,
    depth: usize,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.runtime.inner.frames.borrow_mut().truncate(self.depth);
    }
}
