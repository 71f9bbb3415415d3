//! Request orchestration: validate, parse, select, fan out, aggregate.
//!
//! Each selected backend runs as its own task with a child cancellation
//! token and a per-backend timeout. The join loop is bounded by the overall
//! request deadline; when it expires, every unfinished task is cancelled
//! and aborted, and its slot is reported as `timeout`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::{BackendCall, BackendOutput};
use crate::config::EngineConfig;
use crate::error::{BackendError, Result, SearchError};
use crate::explain::explain;
use crate::preview::{PreviewFetcher, PreviewSource};
use crate::query::parse_request;
use crate::registry::{BackendRegistry, RegisteredBackend, Selection};
use crate::types::{
    AggregatedResponse, BackendId, BackendReport, BackendStatus, ParsedQuery, RawHit, ResultItem,
    Scope, SearchRequest,
};

use super::aggregate::aggregate;

/// Message reported when a count-only request reaches no counting backend.
pub const COUNT_UNSUPPORTED: &str = "count unsupported for this scope/backend-set";

/// Lifecycle of one request. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Validating and parsing the request.
    Parsing,
    /// Choosing backends.
    Selecting,
    /// Spawning one task per backend.
    FanningOut,
    /// Waiting on backend tasks.
    Awaiting,
    /// Building the response from whatever arrived.
    Aggregating,
    /// Response ready.
    Done,
}

#[derive(Debug)]
struct PhaseTracker {
    current: Phase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            current: Phase::Parsing,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.current, "{:?} -> {next:?}", self.current);
        tracing::trace!(from = ?self.current, to = ?next, "phase");
        self.current = next;
    }
}

/// What one backend task produced.
#[derive(Debug)]
struct UnitOutcome {
    id: BackendId,
    result: std::result::Result<BackendOutput, BackendError>,
    latency_ms: u64,
}

impl UnitOutcome {
    fn report(&self) -> BackendReport {
        match &self.result {
            Ok(output) => BackendReport {
                id: self.id.name().to_owned(),
                status: BackendStatus::Ok,
                latency_ms: self.latency_ms,
                hit_count: output.hit_count(),
                error_message: None,
            },
            Err(err @ BackendError::Timeout(_)) => BackendReport {
                id: self.id.name().to_owned(),
                status: BackendStatus::Timeout,
                latency_ms: self.latency_ms,
                hit_count: 0,
                error_message: Some(err.to_string()),
            },
            Err(err) => BackendReport::error(self.id.name(), self.latency_ms, err.to_string()),
        }
    }
}

/// Runs searches against the backends in a [`BackendRegistry`].
pub struct Orchestrator {
    registry: Arc<BackendRegistry>,
    config: EngineConfig,
    previews: Option<PreviewFetcher>,
}

impl Orchestrator {
    /// Create an orchestrator over `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` is invalid.
    pub fn new(registry: Arc<BackendRegistry>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            config,
            previews: None,
        })
    }

    /// Enable content previews read through `source`.
    pub fn with_preview_source(mut self, source: Arc<dyn PreviewSource>) -> Self {
        self.previews = Some(PreviewFetcher::new(source, &self.config));
        self
    }

    /// The registry this orchestrator selects from.
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one search.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Validation`] for a malformed request (no backend is touched)
    /// - [`SearchError::NoBackends`] when no backend can serve the scope
    /// - [`SearchError::AllBackendsFailed`] when every invoked backend failed
    pub async fn run(&self, request: SearchRequest) -> Result<AggregatedResponse> {
        self.run_with_cancel(request, &CancellationToken::new()).await
    }

    /// Run one search, abandoning it when `cancel` fires before aggregation.
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run), plus [`SearchError::Cancelled`].
    pub async fn run_with_cancel(
        &self,
        request: SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregatedResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "catalog_search.request",
            %request_id,
            scope = %request.scope
        );
        self.execute(request, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        request: SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregatedResponse> {
        let started = Instant::now();
        let mut phase = PhaseTracker::new();

        validate(&request)?;
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        let parsed = Arc::new(parse_request(&request));
        tracing::trace!(
            query = %parsed.raw_query,
            keywords = ?parsed.keywords,
            intent = ?parsed.intent,
            "query parsed"
        );

        phase.advance(Phase::Selecting);
        let Selection { selected, skipped } = self
            .registry
            .select_backends(request.scope, &request.backends);
        if selected.is_empty() {
            return Err(no_backends(request.scope, &skipped));
        }

        let response = if request.count_only {
            self.count(&request, &parsed, &selected, skipped, cancel, &mut phase)
                .await?
        } else if request.limit == 0 {
            let mut reports: Vec<BackendReport> = selected
                .iter()
                .map(|e| BackendReport::skipped(e.descriptor.id.name(), "limit is 0"))
                .collect();
            reports.extend(skipped);
            self.respond(&request, &parsed, Vec::new(), None, reports)
        } else {
            self.search(&request, &parsed, &selected, skipped, cancel, &mut phase)
                .await?
        };

        phase.advance(Phase::Done);
        tracing::debug!(
            items = response.items.len(),
            elapsed_ms = elapsed_ms(started),
            "search complete"
        );
        Ok(response)
    }

    async fn search(
        &self,
        request: &SearchRequest,
        parsed: &Arc<ParsedQuery>,
        selected: &[RegisteredBackend],
        skipped: Vec<BackendReport>,
        cancel: &CancellationToken,
        phase: &mut PhaseTracker,
    ) -> Result<AggregatedResponse> {
        let limit = usize::try_from(request.limit).unwrap_or(0);
        let call = BackendCall {
            parsed: Arc::clone(parsed),
            scope: request.scope,
            target: request.target().map(str::to_owned),
            limit: limit.saturating_add(parsed.filters.offset.unwrap_or(0)),
            count_only: false,
        };

        let outcomes = self.fan_out(selected, &call, cancel, phase).await?;
        if outcomes.iter().all(|o| o.result.is_err()) {
            return Err(all_failed(&outcomes));
        }

        phase.advance(Phase::Aggregating);
        let mut reports: Vec<BackendReport> = outcomes.iter().map(UnitOutcome::report).collect();
        reports.extend(skipped);

        let mut total = None;
        let mut raw: BTreeMap<BackendId, Vec<RawHit>> = BTreeMap::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(BackendOutput::Hits { hits, total: t }) => {
                    if outcome.id.supports_count() {
                        total = t;
                    }
                    raw.insert(outcome.id, hits);
                }
                Ok(BackendOutput::Count(n)) => {
                    if outcome.id.supports_count() {
                        total = Some(n);
                    }
                }
                Err(_) => {}
            }
        }

        let mut items = aggregate(raw, request, &parsed.filters);
        if request.include_content_preview {
            if let Some(previews) = &self.previews {
                previews.attach(&mut items).await;
            }
        }
        Ok(self.respond(request, parsed, items, total, reports))
    }

    async fn count(
        &self,
        request: &SearchRequest,
        parsed: &Arc<ParsedQuery>,
        selected: &[RegisteredBackend],
        skipped: Vec<BackendReport>,
        cancel: &CancellationToken,
        phase: &mut PhaseTracker,
    ) -> Result<AggregatedResponse> {
        let counter = selected
            .iter()
            .find(|e| e.descriptor.id.supports_count())
            .cloned();

        let Some(counter) = counter else {
            tracing::debug!("no counting backend selected");
            let mut reports: Vec<BackendReport> = selected
                .iter()
                .map(|e| BackendReport::error(e.descriptor.id.name(), 0, COUNT_UNSUPPORTED))
                .collect();
            reports.extend(skipped);
            return Ok(self.respond(request, parsed, Vec::new(), None, reports));
        };

        let call = BackendCall {
            parsed: Arc::clone(parsed),
            scope: request.scope,
            target: request.target().map(str::to_owned),
            limit: 0,
            count_only: true,
        };
        let outcomes = self
            .fan_out(std::slice::from_ref(&counter), &call, cancel, phase)
            .await?;
        // A failed count only fails the request when nothing else was selected.
        let counted = outcomes.iter().any(|o| o.result.is_ok());
        if !counted && selected.len() == 1 {
            return Err(all_failed(&outcomes));
        }
        if !counted {
            tracing::warn!(backend = %counter.descriptor.id, "count failed; no total available");
        }

        phase.advance(Phase::Aggregating);
        let mut reports: Vec<BackendReport> = outcomes.iter().map(UnitOutcome::report).collect();
        reports.extend(
            selected
                .iter()
                .filter(|e| e.descriptor.id != counter.descriptor.id)
                .map(|e| {
                    BackendReport::skipped(
                        e.descriptor.id.name(),
                        format!("count delegated to {}", counter.descriptor.id),
                    )
                }),
        );
        reports.extend(skipped);

        let total = outcomes.into_iter().find_map(|o| match o.result {
            Ok(BackendOutput::Count(n)) => Some(n),
            Ok(BackendOutput::Hits { total, .. }) => total,
            Err(_) => None,
        });
        Ok(self.respond(request, parsed, Vec::new(), total, reports))
    }

    /// Run every selected backend concurrently; one outcome per backend, in input order.
    async fn fan_out(
        &self,
        selected: &[RegisteredBackend],
        call: &BackendCall,
        cancel: &CancellationToken,
        phase: &mut PhaseTracker,
    ) -> Result<Vec<UnitOutcome>> {
        phase.advance(Phase::FanningOut);
        let started = Instant::now();
        let deadline = started + self.config.request_timeout();
        let per_backend = self.config.backend_timeout();
        let request_cancel = cancel.child_token();

        let mut set = JoinSet::new();
        for (slot, entry) in selected.iter().enumerate() {
            let backend = Arc::clone(&entry.backend);
            let call = call.clone();
            let unit_cancel = request_cancel.child_token();
            set.spawn(
                async move {
                    let unit_started = Instant::now();
                    let execution = backend.execute(&call, &unit_cancel);
                    let result = match tokio::time::timeout(per_backend, execution).await {
                        Ok(result) => result,
                        Err(_) => {
                            unit_cancel.cancel();
                            Err(BackendError::Timeout(format!(
                                "no answer within {}ms",
                                per_backend.as_millis()
                            )))
                        }
                    };
                    let outcome = UnitOutcome {
                        id: backend.id(),
                        result,
                        latency_ms: elapsed_ms(unit_started),
                    };
                    (slot, outcome)
                }
                .in_current_span(),
            );
        }

        phase.advance(Phase::Awaiting);
        let mut slots: Vec<Option<UnitOutcome>> = selected.iter().map(|_| None).collect();
        let expired = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    request_cancel.cancel();
                    set.abort_all();
                    tracing::debug!("request cancelled by caller");
                    return Err(SearchError::Cancelled);
                }
                joined = tokio::time::timeout_at(deadline, set.join_next()) => match joined {
                    Ok(Some(Ok((slot, outcome)))) => slots[slot] = Some(outcome),
                    Ok(Some(Err(err))) => tracing::error!(error = %err, "backend task failed"),
                    Ok(None) => break false,
                    Err(_) => {
                        request_cancel.cancel();
                        set.abort_all();
                        break true;
                    }
                },
            }
        };

        let outcomes: Vec<UnitOutcome> = slots
            .into_iter()
            .zip(selected)
            .map(|(slot, entry)| {
                slot.unwrap_or_else(|| UnitOutcome {
                    id: entry.descriptor.id,
                    result: Err(if expired {
                        BackendError::Timeout(format!(
                            "request budget of {}ms exhausted",
                            self.config.request_timeout_ms
                        ))
                    } else {
                        BackendError::Permanent("backend task aborted".into())
                    }),
                    latency_ms: elapsed_ms(started),
                })
            })
            .collect();

        for outcome in &outcomes {
            match &outcome.result {
                Ok(output) => tracing::debug!(
                    backend = %outcome.id,
                    hits = output.hit_count(),
                    latency_ms = outcome.latency_ms,
                    "backend ok"
                ),
                Err(err) => tracing::warn!(
                    backend = %outcome.id,
                    error = %err,
                    latency_ms = outcome.latency_ms,
                    "backend failed"
                ),
            }
            if !matches!(outcome.result, Err(BackendError::CountUnsupported(_))) {
                self.registry.record_outcome(outcome.id, outcome.result.is_ok());
            }
        }
        Ok(outcomes)
    }

    fn respond(
        &self,
        request: &SearchRequest,
        parsed: &ParsedQuery,
        items: Vec<ResultItem>,
        total: Option<u64>,
        reports: Vec<BackendReport>,
    ) -> AggregatedResponse {
        let explanation = request
            .explain
            .then(|| explain(parsed, &items, &reports, self.config.explain_top_n));
        AggregatedResponse {
            items,
            total_matched_estimate: total,
            backends_queried: reports,
            explanation,
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("previews", &self.previews.is_some())
            .finish()
    }
}

fn validate(request: &SearchRequest) -> Result<()> {
    if request.limit < 0 {
        return Err(SearchError::validation("limit", "must be >= 0"));
    }
    if request.scope != Scope::Global && request.target().is_none() {
        return Err(SearchError::validation(
            "target",
            format!("required when scope is {}", request.scope),
        ));
    }
    Ok(())
}

fn no_backends(scope: Scope, skipped: &[BackendReport]) -> SearchError {
    if skipped.is_empty() {
        return SearchError::NoBackends(scope.to_string());
    }
    let reasons: Vec<String> = skipped
        .iter()
        .map(|r| format!("{}: {}", r.id, r.error_message.as_deref().unwrap_or("skipped")))
        .collect();
    SearchError::NoBackends(format!("{scope} ({})", reasons.join("; ")))
}

fn all_failed(outcomes: &[UnitOutcome]) -> SearchError {
    let reasons: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err().map(|e| format!("{}: {e}", o.id)))
        .collect();
    SearchError::AllBackendsFailed(reasons.join("; "))
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_limit_rejected() {
        let request = SearchRequest {
            limit: -1,
            ..SearchRequest::new("x")
        };
        let err = validate(&request).unwrap_err();
        assert!(matches!(err, SearchError::Validation { field: "limit", .. }));
    }

    #[test]
    fn scoped_request_needs_target() {
        let mut request = SearchRequest {
            scope: Scope::Bucket,
            target: Some("   ".into()),
            ..SearchRequest::new("x")
        };
        let err = validate(&request).unwrap_err();
        assert!(matches!(err, SearchError::Validation { field: "target", .. }));
        assert!(err.to_string().contains("bucket"));

        request.target = Some("lab".into());
        assert!(validate(&request).is_ok());
    }

    #[test]
    fn global_scope_needs_no_target() {
        assert!(validate(&SearchRequest::new("x")).is_ok());
    }

    #[test]
    fn phases_only_move_forward() {
        assert!(Phase::Parsing < Phase::Selecting);
        assert!(Phase::Selecting < Phase::FanningOut);
        assert!(Phase::FanningOut < Phase::Awaiting);
        assert!(Phase::Awaiting < Phase::Aggregating);
        assert!(Phase::Aggregating < Phase::Done);
    }

    #[test]
    fn no_backends_lists_reasons() {
        let err = no_backends(
            Scope::Catalog,
            &[BackendReport::skipped("listing", "does not support catalog scope")],
        );
        assert_eq!(
            err.to_string(),
            "no backend available for scope catalog (listing: does not support catalog scope)"
        );
    }

    #[test]
    fn all_failed_enumerates_each_backend() {
        let outcomes = vec![
            UnitOutcome {
                id: BackendId::FullText,
                result: Err(BackendError::Timeout("no answer within 10ms".into())),
                latency_ms: 10,
            },
            UnitOutcome {
                id: BackendId::Catalog,
                result: Err(BackendError::Permanent("denied".into())),
                latency_ms: 3,
            },
        ];
        assert_eq!(
            all_failed(&outcomes).to_string(),
            "all search backends failed: fulltext: timed out: no answer within 10ms; \
             catalog: permanent failure: denied"
        );
    }

    #[test]
    fn timeout_outcome_reports_timeout_status() {
        let outcome = UnitOutcome {
            id: BackendId::Listing,
            result: Err(BackendError::Timeout("slow".into())),
            latency_ms: 1000,
        };
        let report = outcome.report();
        assert_eq!(report.status, BackendStatus::Timeout);
        assert_eq!(report.id, "listing");
    }
}
