//! Bundles of hooks.

use super::api::{HookRegistrationError, HooksAPI};

/// A reusable set of hooks registered in one call.
///
/// ```
/// use precede_graph::hooks::{HookRegistrationError, HooksAPI, Plugin};
/// use precede_graph::hooks::events::ChainEvent;
/// use precede_graph::hooks::schedule::OnRunComplete;
///
/// struct Summary;
///
/// impl Plugin for Summary {
///     fn build(&self, hooks: &HooksAPI) -> Result<(), HookRegistrationError> {
///         hooks.register_observer::<OnRunComplete, _>("summary", |event: &ChainEvent| {
///             tracing::info!("{event}");
///         })?;
///         Ok(())
///     }
/// }
///
/// let hooks = HooksAPI::new();
/// hooks.add_plugin(Summary)?;
/// # Ok::<(), HookRegistrationError>(())
/// ```
pub trait Plugin: Send + Sync + 'static {
    /// Registers the plugin's hooks.
    ///
    /// # Errors
    ///
    /// Any registration error, typically a duplicate hook name.
    fn build(&self, hooks: &HooksAPI) -> Result<(), HookRegistrationError>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
