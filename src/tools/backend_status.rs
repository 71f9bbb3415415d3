//! `backend_status`: registered backends, their scopes and health.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use quarry_search::Orchestrator;

use crate::error::{QuarryError, Result};

use super::types::Tool;

/// Reports the registry snapshot and circuit-breaker state.
pub struct BackendStatusTool {
    orchestrator: Arc<Orchestrator>,
}

impl BackendStatusTool {
    /// Wrap a shared orchestrator.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for BackendStatusTool {
    fn name(&self) -> &str {
        "backend_status"
    }

    fn description(&self) -> &str {
        "List the registered search backends with their scopes, availability and health."
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<Value> {
        let registry = self.orchestrator.registry();
        let backends = serde_json::to_value(registry.descriptors())
            .map_err(|e| QuarryError::ToolFailed(format!("failed to serialize backends: {e}")))?;
        let health: Vec<Value> = registry
            .health_report()
            .into_iter()
            .map(|(id, state, failures)| {
                json!({
                    "id": id,
                    "state": state,
                    "consecutiveFailures": failures,
                })
            })
            .collect();
        Ok(json!({ "backends": backends, "health": health }))
    }
}
