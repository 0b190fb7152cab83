//! Pool of producer workers sharing one record sink.

use crate::error::ProducerError;
use crate::sink::RecordSink;
use crate::worker::{ProducerStats, Worker, WorkerReport, WorkerSettings};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Default time allowed for the final flush of the producer.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// Summary of a pool run.
#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    /// Number of workers started.
    pub workers: usize,
    /// Reports of the workers that stopped cleanly.
    pub completed: Vec<WorkerReport>,
    /// Workers that ended with an error or panicked.
    pub failed_workers: usize,
    pub submitted: u64,
    pub delivered: u64,
    pub failed_deliveries: u64,
    pub elapsed: Duration,
}

impl PoolReport {
    pub fn records_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.submitted as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Runs `n` independent workers against a single shared sink.
///
/// The sink is the only shared mutable resource; it is injected into every
/// worker as an `Arc`, and no locks are taken around submissions.
pub struct WorkerPool<S: RecordSink> {
    sink: Arc<S>,
    settings: Arc<WorkerSettings>,
    stats: Arc<ProducerStats>,
    flush_timeout: Duration,
}

impl<S: RecordSink> WorkerPool<S> {
    pub fn new(sink: Arc<S>, settings: WorkerSettings) -> Self {
        Self {
            sink,
            settings: Arc::new(settings),
            stats: Arc::new(ProducerStats::default()),
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    pub fn with_flush_timeout(mut self, flush_timeout: Duration) -> Self {
        self.flush_timeout = flush_timeout;
        self
    }

    pub fn stats(&self) -> Arc<ProducerStats> {
        self.stats.clone()
    }

    /// Start `workers` workers and wait until all of them have stopped.
    ///
    /// Workers stop when `cancel` fires or when their record limit is
    /// reached. A failing or panicking worker is logged and does not affect
    /// its siblings. Once every worker has stopped the sink is flushed.
    pub async fn run_workers(
        &self,
        workers: usize,
        cancel: CancellationToken,
    ) -> Result<PoolReport, ProducerError> {
        if workers == 0 {
            return Err(ProducerError::InvalidConfig(
                "at least one worker is required".to_string(),
            ));
        }
        self.settings.validate()?;

        let started = Instant::now();
        let mut tasks = JoinSet::new();
        for id in 0..workers {
            let worker = Worker::new(
                id,
                self.sink.clone(),
                self.settings.clone(),
                self.stats.clone(),
                cancel.clone(),
            );
            tasks.spawn(worker.run());
        }
        info!(
            workers,
            topic = %self.settings.topic,
            "Started {} producer workers", workers
        );

        let mut report = PoolReport {
            workers,
            ..PoolReport::default()
        };
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(worker_report)) => report.completed.push(worker_report),
                Ok(Err(err)) => {
                    error!("Worker failed: {err}");
                    report.failed_workers += 1;
                }
                Err(join_err) => {
                    error!("Worker task aborted: {join_err}");
                    report.failed_workers += 1;
                }
            }
        }

        if let Err(err) = self.sink.flush(self.flush_timeout) {
            warn!("Failed to flush producer within {:?}: {err}", self.flush_timeout);
        }

        let totals = self.stats.snapshot();
        report.submitted = totals.submitted;
        report.delivered = totals.delivered;
        report.failed_deliveries = totals.failed;
        report.elapsed = started.elapsed();
        report.completed.sort_by_key(|w| w.worker_id);

        info!(
            "Producer pool stopped: {} submitted, {} delivered, {} failed in {:?} ({:.2} msg/sec)",
            report.submitted,
            report.delivered,
            report.failed_deliveries,
            report.elapsed,
            report.records_per_second()
        );

        Ok(report)
    }
}
