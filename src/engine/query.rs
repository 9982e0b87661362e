//! Progressive query engine
//!
//! [`QueryEngine`] drives one [`ProgressiveQuery`] handle at a time per
//! caller: `start` builds a fresh handle and fetches block 0, `refine`
//! fetches the next block and merges it. The engine holds no query state
//! of its own; callers own the handle (see `SessionRegistry` for keyed
//! storage).

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::aggregate::{resolve_column, AggregateKind};
use super::errors::{EngineError, EngineResult};
use super::estimate::Estimate;
use super::state::QueryState;
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry};
use crate::source::BlockSource;

/// Handle for one running query
#[derive(Debug, Clone)]
pub struct ProgressiveQuery {
    state: QueryState,
    last: Estimate,
    history: Vec<Estimate>,
    started_at: DateTime<Utc>,
}

impl ProgressiveQuery {
    fn new(state: QueryState) -> Self {
        let last = Estimate::from_state(&state);
        Self {
            state,
            last,
            history: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Most recent estimate
    pub fn estimate(&self) -> &Estimate {
        &self.last
    }

    /// One entry per fetched block, oldest first
    pub fn history(&self) -> &[Estimate] {
        &self.history
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.is_exhausted()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn record(&mut self) -> Estimate {
        self.last = Estimate::from_state(&self.state);
        self.history.push(self.last.clone());
        self.last.clone()
    }
}

/// Runs start/refine against a block source
#[derive(Clone)]
pub struct QueryEngine {
    source: Arc<dyn BlockSource>,
    block_size: u64,
    metrics: Arc<MetricsRegistry>,
}

impl QueryEngine {
    /// Create an engine with its own metrics registry.
    ///
    /// `block_size` is clamped to at least 1.
    pub fn new(source: Arc<dyn BlockSource>, block_size: u64) -> Self {
        Self::with_metrics(source, block_size, Arc::new(MetricsRegistry::new()))
    }

    pub fn with_metrics(
        source: Arc<dyn BlockSource>,
        block_size: u64,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            source,
            block_size: block_size.max(1),
            metrics,
        }
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Start a new query and fetch its first block.
    ///
    /// Nothing is returned unless the first block merged. Callers that keep
    /// the query across a failed first fetch use [`QueryEngine::start_in`].
    pub async fn start(&self, aggregate: &str, column: Option<&str>) -> EngineResult<ProgressiveQuery> {
        let mut query = self.begin(aggregate, column)?;
        self.launch(&mut query).await?;
        Ok(query)
    }

    /// Replace whatever `slot` holds with a new query, then fetch block 0.
    ///
    /// A rejected aggregate or column leaves `slot` untouched. Once the
    /// request validates the old query is gone; if the first fetch fails the
    /// slot holds the new query at offset 0 and `refine` retries block 0.
    pub async fn start_in(
        &self,
        slot: &mut Option<ProgressiveQuery>,
        aggregate: &str,
        column: Option<&str>,
    ) -> EngineResult<Estimate> {
        let query = slot.insert(self.begin(aggregate, column)?);
        self.launch(query).await
    }

    /// Validate the request and build a zeroed query without fetching
    pub fn begin(&self, aggregate: &str, column: Option<&str>) -> EngineResult<ProgressiveQuery> {
        let (kind, column) = match parse_request(aggregate, column) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.metrics.increment_queries_rejected();
                let reason = err.to_string();
                log_event_with_fields(Event::QueryRejected, &[("reason", reason.as_str())]);
                return Err(err);
            }
        };

        let block_size = self.block_size.to_string();
        let source = self.source.describe();
        log_event_with_fields(
            Event::QueryStart,
            &[
                ("aggregate", kind.as_str()),
                ("column", column.as_deref().unwrap_or("")),
                ("block_size", block_size.as_str()),
                ("source", source.as_str()),
            ],
        );

        Ok(ProgressiveQuery::new(QueryState::new(kind, column, self.block_size)))
    }

    async fn launch(&self, query: &mut ProgressiveQuery) -> EngineResult<Estimate> {
        match self.advance(query).await {
            Ok(estimate) => {
                self.metrics.increment_queries_started();
                Ok(estimate)
            }
            Err(err) => {
                self.metrics.increment_queries_rejected();
                Err(err)
            }
        }
    }

    /// Fetch and merge the next block.
    ///
    /// On an exhausted query this returns the last estimate unchanged and
    /// does not touch the source. On failure the query is unchanged and the
    /// same call can be retried.
    pub async fn refine(&self, query: &mut ProgressiveQuery) -> EngineResult<Estimate> {
        if query.is_exhausted() {
            self.metrics.increment_refine_noops();
            let rows = query.state.running_count().to_string();
            log_event_with_fields(Event::RefineNoop, &[("rows_processed", rows.as_str())]);
            return Ok(query.last.clone());
        }
        self.advance(query).await
    }

    async fn advance(&self, query: &mut ProgressiveQuery) -> EngineResult<Estimate> {
        let offset = query.state.offset();
        let block_size = query.state.block_size();
        let offset_field = offset.to_string();

        let block = match self
            .source
            .fetch(query.state.column(), offset, block_size)
            .await
        {
            Ok(block) => block,
            Err(err) => {
                self.metrics.increment_source_failures();
                let reason = err.to_string();
                log_event_with_fields(
                    Event::BlockFailed,
                    &[("offset", offset_field.as_str()), ("reason", reason.as_str())],
                );
                return Err(EngineError::from(err));
            }
        };

        if let Err(err) = query.state.merge(&block) {
            let reason = err.to_string();
            Logger::error(
                "MERGE_REJECTED",
                &[("offset", offset_field.as_str()), ("reason", reason.as_str())],
            );
            return Err(err);
        }

        self.metrics.record_block(block.rows());
        let rows = block.rows().to_string();
        Logger::trace(
            Event::BlockFetched.as_str(),
            &[("offset", offset_field.as_str()), ("rows", rows.as_str())],
        );

        if query.state.is_exhausted() {
            let total = query.state.running_count().to_string();
            log_event_with_fields(Event::QueryExhausted, &[("rows_processed", total.as_str())]);
        }

        Ok(query.record())
    }
}

fn parse_request(aggregate: &str, column: Option<&str>) -> EngineResult<(AggregateKind, Option<String>)> {
    let kind: AggregateKind = aggregate.parse()?;
    let column = resolve_column(kind, column)?;
    Ok((kind, column))
}
