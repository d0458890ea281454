//! Core hook engine for hookline.
//!
//! Components render through a [`Runtime`], which hands each render function
//! a [`Hooks`] value bound to the component's [`Instance`]. Hooks keep state
//! in positional slots on the instance, so the same call order must be used
//! on every render.
//!
//! # Available Hooks
//!
//! | Hook | Purpose |
//! |------|---------|
//! | [`Hooks::use_state`] | State with a stable `(value, setter)` pair |
//! | [`Hooks::use_reducer`] | State driven by a reducer and dispatched actions |
//! | [`Hooks::use_ref`] | Mutable box that never triggers renders |
//! | [`Hooks::use_memo`] | Cached computation keyed by dependencies |
//! | [`Hooks::use_callback`] | Stable callback keyed by dependencies |
//! | [`Hooks::use_effect`] | Passive side effect after render |
//! | [`Hooks::use_layout_effect`] | Synchronous side effect at commit |
//! | [`Hooks::use_mount`] | Effect that runs once after mount |
//! | [`Hooks::use_imperative_handle`] | Expose a value through a forwarded ref |
//! | [`Hooks::use_context`] | Read a host-provided value |
//!
//! The host owns the instances. It implements [`InstanceHost`] to receive
//! render requests, calls the instance lifecycle methods
//! ([`Instance::did_mount`], [`Instance::did_update`],
//! [`Instance::will_unmount`]) around commits, and supplies a [`Scheduler`]
//! for passive effects.

pub mod config;
pub mod effect;
pub mod equality;
pub mod error;
pub mod hooks;
pub mod instance;
pub mod runtime;
pub mod scheduler;
pub mod update;

#[cfg(test)]
mod testing;

pub use config::{DEFAULT_MAX_RENDER_RESTARTS, EngineConfig};
pub use effect::ForwardedRef;
pub use equality::{Dep, Deps, SameValue, are_inputs_equal, inputs_changed};
pub use error::{HookError, Result};
pub use hooks::{Context, ContextId, Dispatch, Hooks, RefHandle, SetState, Update};
pub use instance::{HookKind, HookMeta, Instance, InstanceHost, InstanceId, LifecycleHandler};
pub use runtime::Runtime;
pub use scheduler::{PassiveEffectQueue, ScheduledCallback, Scheduler};
pub use update::UpdatePhase;
