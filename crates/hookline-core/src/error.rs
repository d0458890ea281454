//! Errors raised by the hook engine.

use thiserror::Error;

/// Result type used throughout the hook engine.
pub type Result<T, E = HookError> = std::result::Result<T, E>;

/// Everything that can go wrong while rendering hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A hook was called while its instance was not the one rendering.
    #[error(
        "`{hook}` called outside of render; hooks can only be called while their component is rendering"
    )]
    InvalidContext { hook: &'static str },

    /// The number of hook calls changed between two renders.
    #[error(
        "hook count mismatch: previous render had {expected} hooks, current render has {actual} (render #{render})"
    )]
    HookCountMismatch {
        expected: usize,
        actual: usize,
        render: usize,
    },

    /// A different hook was called at a slot than in the previous render.
    #[error("hook order mismatch at index {index}: previous render called `{previous}`, current render called `{current}`")]
    HookOrderMismatch {
        index: usize,
        previous: &'static str,
        current: &'static str,
    },

    /// The value stored at a slot has a different type than requested.
    #[error("hook slot {index} does not hold a `{expected}`")]
    SlotTypeMismatch {
        index: usize,
        expected: &'static str,
    },

    /// Render-phase updates kept scheduling restarts past the configured limit.
    #[error("too many render restarts (limit {limit}); a state update during render never settles")]
    TooManyRenderRestarts { limit: usize },
}
