//! Routing of state updates.
//!
//! Every state updater and reducer dispatcher funnels through
//! [`route_update`], which decides whether the update lands in the render
//! that is running right now or in a later one.

use crate::instance::{Instance, InstanceInner};
use crate::runtime::Runtime;
use std::rc::Weak;

/// How an update was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// The owning instance was mid-render; its render restarts.
    RenderPhase,
    /// The owning instance was idle; a new render was requested.
    Deferred,
    /// The new value was the same as the stored one; nothing happened.
    Unchanged,
    /// The owning instance no longer exists.
    Dropped,
}

/// Apply a state mutation on behalf of `owner`.
///
/// While `owner` is the instance currently rendering, `apply` runs right
/// away and the render is flagged for a restart; the host is not involved.
/// Otherwise queued passive effects are flushed first (unless something is
/// already rendering), then `apply` runs and the host is asked to re-render.
pub(crate) fn route_update(
    runtime: &Runtime,
    owner: &Weak<InstanceInner>,
    apply: impl FnOnce(),
) -> UpdatePhase {
    let Some(instance) = Instance::upgrade(owner) else {
        tracing::warn!("state update on an unmounted instance ignored");
        return UpdatePhase::Dropped;
    };

    if runtime.is_rendering_instance(&instance) {
        apply();
        instance.schedule_render();
        tracing::trace!(instance = %instance.id(), "render-phase update");
        return UpdatePhase::RenderPhase;
    }

    if !runtime.is_rendering() {
        runtime.flush_passive_effects();
    }
    apply();
    tracing::debug!(instance = %instance.id(), "deferred update, requesting render");
    instance.update();
    UpdatePhase::Deferred
}
