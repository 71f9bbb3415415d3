//! `catalog_search`: one query across every configured search backend.
//!
//! Arguments are validated here before the engine sees them so that a bad
//! field is reported by name. A search that degrades (some backends failed)
//! still succeeds; the response's `backendsQueried` shows what happened.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use quarry_search::{Orchestrator, Scope, SearchFilters, SearchRequest};

use crate::error::{QuarryError, Result};

use super::types::Tool;

/// Tool wrapping an [`Orchestrator`].
///
/// # Arguments (JSON)
///
/// - `query` (string, required): free text, may be empty
/// - `scope` (string): `global` (default), `catalog`, `package` or `bucket`
/// - `target` (string): required unless scope is `global`
/// - `backends` (array of strings): explicit backend ids
/// - `limit` (integer >= 0, default 50)
/// - `includeMetadata`, `includeContentPreview`, `explain`, `countOnly` (booleans)
/// - `filters` (object): `extensions`, `minSize`, `maxSize`,
///   `modifiedAfter`, `modifiedBefore`, `offset`
pub struct CatalogSearchTool {
    orchestrator: Arc<Orchestrator>,
}

impl CatalogSearchTool {
    /// Wrap a shared orchestrator.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

fn invalid(field: &str, message: impl std::fmt::Display) -> QuarryError {
    QuarryError::ToolValidation(format!("invalid argument `{field}`: {message}"))
}

/// Look up `camel` or its snake_case spelling.
fn field<'a>(args: &'a Map<String, Value>, camel: &str, snake: &str) -> Option<&'a Value> {
    args.get(camel)
        .or_else(|| args.get(snake))
        .filter(|v| !v.is_null())
}

fn flag(args: &Map<String, Value>, camel: &str, snake: &str) -> Result<bool> {
    match field(args, camel, snake) {
        None => Ok(false),
        Some(v) => v.as_bool().ok_or_else(|| invalid(camel, "must be a boolean")),
    }
}

/// Convert tool arguments into a [`SearchRequest`].
///
/// # Errors
///
/// Returns [`QuarryError::ToolValidation`] naming the first invalid field.
pub fn parse_args(args: &Value) -> Result<SearchRequest> {
    let args = args
        .as_object()
        .ok_or_else(|| QuarryError::ToolValidation("arguments must be a JSON object".into()))?;

    let query = match args.get("query") {
        Some(Value::String(q)) => q.clone(),
        Some(_) => return Err(invalid("query", "must be a string")),
        None => {
            return Err(QuarryError::ToolValidation(
                "missing required argument: query".into(),
            ));
        }
    };

    let mut request = SearchRequest::new(query);

    if let Some(scope) = field(args, "scope", "scope") {
        let raw = scope.as_str().ok_or_else(|| invalid("scope", "must be a string"))?;
        request.scope = raw.parse::<Scope>().map_err(|e| invalid("scope", e))?;
    }

    if let Some(target) = field(args, "target", "target") {
        let raw = target
            .as_str()
            .ok_or_else(|| invalid("target", "must be a string"))?;
        request.target = Some(raw.to_owned());
    }

    if let Some(backends) = field(args, "backends", "backends") {
        let list = backends
            .as_array()
            .ok_or_else(|| invalid("backends", "must be an array of strings"))?;
        request.backends = list
            .iter()
            .map(|b| {
                b.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| invalid("backends", "must be an array of strings"))
            })
            .collect::<Result<Vec<_>>>()?;
    }

    if let Some(limit) = field(args, "limit", "limit") {
        let n = limit
            .as_i64()
            .ok_or_else(|| invalid("limit", "must be an integer"))?;
        if n < 0 {
            return Err(invalid("limit", "must be >= 0"));
        }
        request.limit = n;
    }

    request.include_metadata = flag(args, "includeMetadata", "include_metadata")?;
    request.include_content_preview =
        flag(args, "includeContentPreview", "include_content_preview")?;
    request.explain = flag(args, "explain", "explain")?;
    request.count_only = flag(args, "countOnly", "count_only")?;

    if let Some(filters) = field(args, "filters", "filters") {
        if !filters.is_object() {
            return Err(invalid("filters", "must be an object"));
        }
        request.filters = serde_json::from_value::<SearchFilters>(filters.clone())
            .map_err(|e| invalid("filters", e))?;
    }

    Ok(request)
}

#[async_trait]
impl Tool for CatalogSearchTool {
    fn name(&self) -> &str {
        "catalog_search"
    }

    fn description(&self) -> &str {
        "Search the data catalog across the full-text index, the catalog graph and raw \
         bucket listings. Returns merged, ranked items and a per-backend status."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Free-text query" },
                "scope": {
                    "type": "string",
                    "enum": ["global", "catalog", "package", "bucket"],
                    "description": "Search breadth (default global)"
                },
                "target": {
                    "type": "string",
                    "description": "Catalog, package or bucket name; required unless scope is global"
                },
                "backends": {
                    "type": "array",
                    "items": { "type": "string", "enum": ["fulltext", "catalog", "listing"] }
                },
                "limit": { "type": "integer", "minimum": 0, "description": "Maximum items (default 50)" },
                "includeMetadata": { "type": "boolean" },
                "includeContentPreview": { "type": "boolean" },
                "explain": { "type": "boolean" },
                "countOnly": { "type": "boolean" },
                "filters": {
                    "type": "object",
                    "properties": {
                        "extensions": { "type": "array", "items": { "type": "string" } },
                        "minSize": { "type": "integer", "minimum": 0 },
                        "maxSize": { "type": "integer", "minimum": 0 },
                        "modifiedAfter": { "type": "string", "format": "date-time" },
                        "modifiedBefore": { "type": "string", "format": "date-time" },
                        "offset": { "type": "integer", "minimum": 0 }
                    }
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let request = parse_args(&args)?;
        let response = self.orchestrator.run(request).await?;
        serde_json::to_value(&response)
            .map_err(|e| QuarryError::ToolFailed(format!("failed to serialize response: {e}")))
    }
}
