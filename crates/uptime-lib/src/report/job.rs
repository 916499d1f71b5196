//! Background report jobs
//!
//! A trigger returns an id immediately; the report is built on the blocking
//! pool and its state is published through a watch channel per job. Finished
//! jobs are kept up to a retention limit, oldest evicted first.

use super::{build_report, Report, ReportOptions};
use crate::health::HealthRegistry;
use crate::ingest::{Dataset, ObservationSource};
use crate::observability::{ReportMetrics, StructuredLogger};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, RwLock};
use tracing::debug;
use uuid::Uuid;

pub type ReportId = Uuid;

/// Finished jobs kept for polling before the oldest are evicted
pub const DEFAULT_RETAINED_REPORTS: usize = 64;

/// Lifecycle of one report job
#[derive(Debug, Clone)]
pub enum ReportState {
    Running,
    Complete { report: Arc<Report> },
    Failed { error: String },
}

impl ReportState {
    pub fn is_running(&self) -> bool {
        matches!(self, ReportState::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportState::Running => "running",
            ReportState::Complete { .. } => "complete",
            ReportState::Failed { .. } => "failed",
        }
    }

    pub fn report(&self) -> Option<&Arc<Report>> {
        match self {
            ReportState::Complete { report } => Some(report),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Jobs {
    states: HashMap<ReportId, watch::Receiver<ReportState>>,
    /// Ids in trigger order
    order: VecDeque<ReportId>,
}

impl Jobs {
    /// Drop the oldest finished jobs until at most `retain` remain
    ///
    /// Running jobs are never evicted. Returns the number removed.
    fn evict_finished(&mut self, retain: usize) -> usize {
        let finished = self
            .states
            .values()
            .filter(|rx| !rx.borrow().is_running())
            .count();
        let mut excess = finished.saturating_sub(retain);
        if excess == 0 {
            return 0;
        }

        let states = &mut self.states;
        let before = self.order.len();
        self.order.retain(|id| {
            if excess == 0 {
                return true;
            }
            let done = states.get(id).map_or(true, |rx| !rx.borrow().is_running());
            if done {
                states.remove(id);
                excess -= 1;
            }
            !done
        });
        before - self.order.len()
    }
}

/// Registry of report jobs keyed by id
#[derive(Clone)]
pub struct ReportRegistry {
    jobs: Arc<RwLock<Jobs>>,
    latest_dataset: Arc<RwLock<Option<Arc<Dataset>>>>,
    retain_finished: usize,
    metrics: ReportMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl ReportRegistry {
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Jobs::default())),
            latest_dataset: Arc::new(RwLock::new(None)),
            retain_finished: DEFAULT_RETAINED_REPORTS,
            metrics: ReportMetrics::new(),
            logger,
            health: None,
        }
    }

    /// Number of finished jobs kept before the oldest are evicted
    pub fn with_retention(mut self, retain_finished: usize) -> Self {
        self.retain_finished = retain_finished;
        self
    }

    /// Report job and dataset outcomes to a health registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Start building a report in the background
    pub async fn trigger(
        &self,
        source: Arc<dyn ObservationSource>,
        options: ReportOptions,
    ) -> ReportId {
        let id = Uuid::new_v4();
        let (tx, rx) = watch::channel(ReportState::Running);
        {
            let mut jobs = self.jobs.write().await;
            let evicted = jobs.evict_finished(self.retain_finished);
            if evicted > 0 {
                debug!(evicted, retained = self.retain_finished, "Evicted finished report jobs");
            }
            jobs.states.insert(id, rx);
            jobs.order.push_back(id);
        }

        let registry = self.clone();
        tokio::spawn(async move {
            let state = registry.run(id, source, options).await;
            // Only finished jobs are evicted, so the receiver is still held here
            let _ = tx.send(state);
        });

        id
    }

    async fn run(
        &self,
        id: ReportId,
        source: Arc<dyn ObservationSource>,
        options: ReportOptions,
    ) -> ReportState {
        let report_id = id.to_string();
        let description = source.describe();
        self.logger.log_report_started(&report_id, &description);
        self.metrics.inc_running_reports();
        let start = Instant::now();

        let result = self.load_and_build(source, options).await;
        self.metrics.dec_running_reports();

        match result {
            Ok(report) => {
                let elapsed = start.elapsed().as_secs_f64();
                self.metrics.observe_report_latency(elapsed);
                self.metrics.add_stores_processed(report.rows.len());
                self.metrics.add_empty_horizons(report.empty_horizons);
                for failure in &report.failures {
                    self.logger.log_store_failure(failure.store_id, &failure.error);
                }
                self.logger.log_report_completed(
                    &report_id,
                    report.rows.len(),
                    report.failures.len(),
                    report.empty_horizons,
                    elapsed,
                );
                if let Some(health) = &self.health {
                    health.mark_report_succeeded(report.failures.len()).await;
                }
                ReportState::Complete {
                    report: Arc::new(report),
                }
            }
            Err(error) => {
                self.metrics.inc_failed_reports();
                self.logger.log_report_failed(&report_id, &error);
                if let Some(health) = &self.health {
                    health.mark_report_failed(error.clone()).await;
                }
                ReportState::Failed { error }
            }
        }
    }

    async fn load_and_build(
        &self,
        source: Arc<dyn ObservationSource>,
        options: ReportOptions,
    ) -> Result<Report, String> {
        let dataset = match source.load().await {
            Ok(dataset) => dataset,
            Err(e) => {
                if let Some(health) = &self.health {
                    health.mark_dataset_failed(e.to_string()).await;
                }
                return Err(e.to_string());
            }
        };

        let dataset = Arc::new(dataset);
        self.publish_dataset(dataset.clone()).await;
        self.metrics.add_rejected_records(dataset.rejected.len());
        self.metrics
            .set_dataset_size(dataset.stores().len(), dataset.observation_count());
        self.logger.log_dataset_loaded(&source.describe(), &dataset);
        if let Some(health) = &self.health {
            health.mark_dataset_loaded(dataset.rejected.len()).await;
        }

        tokio::task::spawn_blocking(move || build_report(&dataset, &options))
            .await
            .map_err(|e| format!("report task failed: {}", e))
    }

    /// Replace the most recently loaded dataset
    pub async fn publish_dataset(&self, dataset: Arc<Dataset>) {
        *self.latest_dataset.write().await = Some(dataset);
    }

    /// Dataset loaded by the latest job or explicit publish
    pub async fn latest_dataset(&self) -> Option<Arc<Dataset>> {
        self.latest_dataset.read().await.clone()
    }

    /// Current state of a job, None for unknown or evicted ids
    pub async fn status(&self, id: ReportId) -> Option<ReportState> {
        let jobs = self.jobs.read().await;
        jobs.states.get(&id).map(|rx| rx.borrow().clone())
    }

    /// Wait until a job leaves the running state
    pub async fn wait(&self, id: ReportId) -> Option<ReportState> {
        let mut rx = self.jobs.read().await.states.get(&id)?.clone();
        let state = match rx.wait_for(|state| !state.is_running()).await {
            Ok(state) => state.clone(),
            Err(_) => ReportState::Failed {
                error: "report task ended without a result".to_string(),
            },
        };
        Some(state)
    }

    pub async fn running_count(&self) -> usize {
        let jobs = self.jobs.read().await;
        jobs.states
            .values()
            .filter(|rx| rx.borrow().is_running())
            .count()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.states.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.states.is_empty()
    }
}
