//! Engine configuration.

/// Default cap on render restarts caused by render-phase updates.
pub const DEFAULT_MAX_RENDER_RESTARTS: usize = 25;

/// Tunables for a [`Runtime`](crate::Runtime).
///
/// # Example
///
/// ```
/// use hookline_core::EngineConfig;
///
/// let config = EngineConfig::default()
///     .max_render_restarts(Some(5))
///     .check_hook_order(true);
/// assert_eq!(config.max_render_restarts, Some(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How many times a single render may restart because of render-phase
    /// updates before failing with
    /// [`HookError::TooManyRenderRestarts`](crate::HookError::TooManyRenderRestarts).
    /// `None` disables the limit.
    pub max_render_restarts: Option<usize>,
    /// Verify that every render calls the same hooks in the same order.
    pub check_hook_order: bool,
}

impl EngineConfig {
    /// Set the render restart limit.
    pub fn max_render_restarts(mut self, limit: Option<usize>) -> Self {
        self.max_render_restarts = limit;
        self
    }

    /// Enable or disable hook count and order checks.
    pub fn check_hook_order(mut self, enabled: bool) -> Self {
        self.check_hook_order = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_render_restarts: Some(DEFAULT_MAX_RENDER_RESTARTS),
            check_hook_order: cfg!(debug_assertions),
        }
    }
}
