//! Core tool trait.

use async_trait::async_trait;

use crate::error::Result;

/// A named operation callable with JSON arguments.
///
/// All tools must be `Send + Sync` so the host can share them across tasks.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used on the wire (e.g. `catalog_search`).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for the arguments.
    fn schema(&self) -> serde_json::Value;

    /// Run the tool.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::ToolValidation`](crate::error::QuarryError::ToolValidation)
    /// for bad arguments, other variants for execution failures.
    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value>;
}
