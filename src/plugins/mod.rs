pub mod builtin;
pub mod registry;
pub mod sandbox;

use async_trait::async_trait;

/// A capability handler dispatched by name over the plugin endpoint.
///
/// Handlers are stateless process-lifetime singletons: they hold no mutable
/// state, so concurrent `execute` calls on the same instance are safe.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique identifier used as the registry key (e.g. "file_access").
    fn name(&self) -> &str;

    /// Human-readable description of what the handler does.
    fn description(&self) -> &str;

    /// Execute the handler with a free-form input string.
    ///
    /// Always returns a string: failure conditions are encoded as
    /// human-readable messages in the result, never raised. The transport
    /// layer only rejects requests for handlers that do not exist.
    async fn execute(&self, input: &str) -> String;
}

pub use registry::PluginRegistry;
