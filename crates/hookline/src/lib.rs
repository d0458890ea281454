//! Hookline - React-style hooks for Rust components.
//!
//! A component is a render function that takes [`Hooks`](core::Hooks) and
//! returns its output. State, reducers, refs, memoized values and effects
//! live in hook slots owned by the component instance and survive between
//! renders.
//!
//! # Quick Start
//!
//! ```
//! use hookline::prelude::*;
//!
//! let mut pipeline = Pipeline::default();
//! let setter = std::rc::Rc::new(std::cell::RefCell::new(None));
//!
//! let slot = setter.clone();
//! let id = pipeline.mount(move |hooks| {
//!     let (count, set_count) = hooks.use_state(|| 0)?;
//!     *slot.borrow_mut() = Some(set_count);
//!     Ok(format!("Count: {count}"))
//! })?;
//!
//! if let Some(set_count) = setter.borrow().as_ref() {
//!     set_count.update(|n| n + 1);
//! }
//! pipeline.run_until_idle()?;
//! assert_eq!(pipeline.output(id).map(String::as_str), Some("Count: 1"));
//! # Ok::<(), PipelineError>(())
//! ```
//!
//! # Rules of Hooks
//!
//! Hooks must be called in the **same order** on every render:
//!
//! - Call hooks at the top level of the render function
//! - Don't call hooks inside conditionals or loops
//! - Don't call hooks after early returns
//!
//! See [`hookline_core::hooks`] for details.

pub mod pipeline;

pub mod prelude {
    //! Common imports for hookline components.
    pub use crate::pipeline::{ComponentId, Pipeline, PipelineConfig, PipelineError};
    pub use hookline_core::{
        Context, Dispatch, EngineConfig, ForwardedRef, HookError, Hooks, RefHandle, SameValue,
        SetState, Update, UpdatePhase, deps,
    };
}

pub use hookline_core::{deps, same_value_by_eq};
pub use pipeline::{ComponentId, Pipeline, PipelineConfig, PipelineError};

pub use hookline_core as core;

/// Install a `tracing` subscriber that prints to stderr.
///
/// Does nothing when a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}
