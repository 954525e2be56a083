//! The extract → transform → load chain.
//!
//! [`Pipeline`] exposes the three tasks as plain methods with no scheduler
//! dependency. [`run_workflow`] is a minimal orchestrator that runs them in
//! order under a [`WorkflowDefinition`]'s retry policy.
//!
//! Runs are not locked against each other; two concurrent runs against the same
//! destination table are unsafe.

use std::fmt::Display;
use std::future::Future;
use tracing::{error, info, info_span, warn, Instrument};

use crate::api::MarketDataSource;
use crate::database::Warehouse;
use crate::error::{FetchError, LoadError, PipelineError, TransformError};
use crate::loader::Loader;
use crate::models::{Config, RawResponse, ResultSet};
use crate::transform::transform;

pub mod workflow;
pub use workflow::{TaskId, WorkflowDefinition};

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub symbol: String,
    pub records: usize,
    /// `None` when the load task was skipped
    pub loaded: Option<usize>,
}

pub struct Pipeline {
    source: Box<dyn MarketDataSource>,
    loader: Loader,
    symbol: String,
    record_limit: usize,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        source: Box<dyn MarketDataSource>,
        warehouse: Box<dyn Warehouse>,
    ) -> Result<Self, LoadError> {
        if config.uses_placeholder_api_key() {
            warn!(
                "No API key configured; Alpha Vantage will answer with an error document and {} will be recreated empty",
                config.table
            );
        }

        Ok(Self {
            source,
            loader: Loader::new(warehouse, &config.table)?,
            symbol: config.symbol.clone(),
            record_limit: config.record_limit,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// `extract`: fetch the raw daily series
    pub async fn extract(&self) -> Result<RawResponse, FetchError> {
        self.source.fetch_daily_series(&self.symbol).await
    }

    /// `process_stock_data`: reshape into at most `record_limit` records
    pub fn process_stock_data(&self, raw: &RawResponse) -> Result<ResultSet, TransformError> {
        transform(raw, &self.symbol, self.record_limit)
    }

    /// `load_data_to_snowflake`: replace the destination table
    pub async fn load(&self, records: &ResultSet) -> Result<usize, LoadError> {
        if records.is_empty() {
            warn!(
                "No records for {}; {} will be recreated empty",
                self.symbol,
                self.loader.table()
            );
        }
        self.loader.load(records).await
    }

    /// Run the three tasks once, in order
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let raw = self.extract().await?;
        let records = self.process_stock_data(&raw)?;
        let loaded = self.load(&records).await?;

        Ok(RunSummary {
            symbol: self.symbol.clone(),
            records: records.len(),
            loaded: Some(loaded),
        })
    }
}

/// Run the workflow's chain, retrying each task per the definition.
///
/// With `dry_run` the load task is skipped and the destination is untouched.
pub async fn run_workflow(
    workflow: &WorkflowDefinition,
    pipeline: &Pipeline,
    dry_run: bool,
) -> Result<(ResultSet, RunSummary), PipelineError> {
    info!("🚀 Starting {} for {}", workflow.dag_id, pipeline.symbol());

    let raw = run_task(workflow, TaskId::Extract, || pipeline.extract()).await?;

    let records = run_task(workflow, TaskId::ProcessStockData, || {
        std::future::ready(pipeline.process_stock_data(&raw))
    })
    .await?;

    let loaded = if dry_run {
        info!("⏭️  Dry run, skipping {}", TaskId::LoadDataToSnowflake);
        None
    } else {
        Some(run_task(workflow, TaskId::LoadDataToSnowflake, || pipeline.load(&records)).await?)
    };

    let summary = RunSummary {
        symbol: pipeline.symbol().to_string(),
        records: records.len(),
        loaded,
    };
    info!("🎉 {} finished: {:?}", workflow.dag_id, summary);
    Ok((records, summary))
}

async fn run_task<T, E, F, Fut>(workflow: &WorkflowDefinition, task: TaskId, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let span = info_span!("task", task_id = task.as_str());
    let attempts = workflow.attempts();

    if let Some(upstream) = workflow.upstream_of(task) {
        span.in_scope(|| info!("Upstream {} succeeded", upstream));
    }

    let mut attempt = 1;
    loop {
        let fut = span.in_scope(&mut op);
        match fut.instrument(span.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                span.in_scope(|| {
                    warn!(
                        "Attempt {}/{} failed: {}; retrying in {}s",
                        attempt,
                        attempts,
                        e,
                        workflow.retry_delay.as_secs()
                    )
                });
                tokio::time::sleep(workflow.retry_delay).await;
                attempt += 1;
            }
            Err(e) => {
                span.in_scope(|| error!("❌ Failed after {} attempt(s): {}", attempt, e));
                return Err(e);
            }
        }
    }
}
