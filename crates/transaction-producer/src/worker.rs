//! A single producer worker.
//!
//! Each worker owns its generator and a set of in-flight deliveries, and
//! shares the record sink, the statistics and the cancellation token with the
//! rest of the pool.

use crate::error::{DeliveryError, ProducerError};
use crate::sink::{DeliveryReport, PendingDelivery, RecordSink, SubmitError};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use transaction_generator::TransactionGenerator;

/// Default number of submissions between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;
/// Default number of submissions between delivery collection and yielding.
pub const DEFAULT_POLL_INTERVAL: u64 = 50_000;

/// Settings shared by every worker of a pool.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub topic: String,
    /// Stop after this many submissions; `None` runs until cancelled.
    pub records_per_worker: Option<u64>,
    pub seed: Option<u64>,
    pub progress_interval: u64,
    pub poll_interval: u64,
}

impl WorkerSettings {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            records_per_worker: None,
            seed: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_records_per_worker(mut self, records: u64) -> Self {
        self.records_per_worker = Some(records);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ProducerError> {
        if self.topic.is_empty() {
            return Err(ProducerError::InvalidConfig(
                "topic name must not be empty".to_string(),
            ));
        }
        if self.progress_interval == 0 || self.poll_interval == 0 {
            return Err(ProducerError::InvalidConfig(
                "progress and poll intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters shared by all workers of a pool.
#[derive(Debug, Default)]
pub struct ProducerStats {
    submitted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`ProducerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl ProducerStats {
    fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// What one worker did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub submitted: u64,
    pub delivered: u64,
    pub failed: u64,
}

pub struct Worker<S: RecordSink> {
    id: usize,
    sink: Arc<S>,
    settings: Arc<WorkerSettings>,
    stats: Arc<ProducerStats>,
    cancel: CancellationToken,
    generator: TransactionGenerator,
    in_flight: FuturesUnordered<PendingDelivery>,
    report: WorkerReport,
}

impl<S: RecordSink> Worker<S> {
    pub fn new(
        id: usize,
        sink: Arc<S>,
        settings: Arc<WorkerSettings>,
        stats: Arc<ProducerStats>,
        cancel: CancellationToken,
    ) -> Self {
        let generator = TransactionGenerator::for_worker(settings.seed, id);
        Self {
            id,
            sink,
            settings,
            stats,
            cancel,
            generator,
            in_flight: FuturesUnordered::new(),
            report: WorkerReport {
                worker_id: id,
                ..WorkerReport::default()
            },
        }
    }

    /// Produce until the record limit is reached or the pool is cancelled,
    /// then wait for every outstanding delivery.
    pub async fn run(mut self) -> Result<WorkerReport, ProducerError> {
        debug!("Worker {} started", self.id);

        let result = self.produce().await;
        self.settle().await;

        result.map(|()| {
            info!(
                worker = self.id,
                submitted = self.report.submitted,
                delivered = self.report.delivered,
                failed = self.report.failed,
                "Worker {} stopped",
                self.id
            );
            self.report
        })
    }

    async fn produce(&mut self) -> Result<(), ProducerError> {
        while !self.limit_reached() && !self.cancel.is_cancelled() {
            let record = self
                .generator
                .next_record(chrono::Utc::now().timestamp());
            let payload = record.to_json_bytes()?;

            let Some(delivery) = self.submit(record.key(), &payload).await? else {
                break;
            };
            self.in_flight.push(delivery);
            self.report.submitted += 1;
            self.stats.record_submitted();

            let submitted = self.report.submitted;
            if submitted % self.settings.progress_interval == 0 {
                info!(
                    worker = self.id,
                    submitted, "Worker {} produced {} messages so far", self.id, submitted
                );
            }
            if submitted % self.settings.poll_interval == 0 {
                self.collect_completed();
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }

    /// Hand one record to the sink. Returns `None` when the worker was
    /// cancelled while waiting for queue space.
    async fn submit(
        &mut self,
        key: &str,
        payload: &[u8],
    ) -> Result<Option<PendingDelivery>, ProducerError> {
        loop {
            match self.sink.submit(&self.settings.topic, key, payload) {
                Ok(delivery) => return Ok(Some(delivery)),
                Err(SubmitError::Failed(err)) => return Err(err),
                Err(SubmitError::QueueFull) => {}
            }

            if self.cancel.is_cancelled() {
                return Ok(None);
            }
            self.collect_completed();
            tokio::task::yield_now().await;
        }
    }

    fn limit_reached(&self) -> bool {
        self.settings
            .records_per_worker
            .is_some_and(|limit| self.report.submitted >= limit)
    }

    /// Observe every delivery that has already completed, without waiting.
    fn collect_completed(&mut self) {
        while let Some(Some(outcome)) = self.in_flight.next().now_or_never() {
            self.observe(outcome);
        }
    }

    async fn settle(&mut self) {
        if !self.in_flight.is_empty() {
            debug!(
                "Worker {} waiting for {} in-flight deliveries",
                self.id,
                self.in_flight.len()
            );
        }
        while let Some(outcome) = self.in_flight.next().await {
            self.observe(outcome);
        }
    }

    fn observe(&mut self, outcome: Result<DeliveryReport, DeliveryError>) {
        match outcome {
            Ok(report) => {
                self.report.delivered += 1;
                self.stats.record_delivered();
                debug!("Record {} successfully produced", report.key);
            }
            Err(err) => {
                self.report.failed += 1;
                self.stats.record_failed();
                error!(worker = self.id, "{err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemorySink;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;
    use transaction_generator::TransactionRecord;

    fn worker(
        sink: Arc<MemorySink>,
        settings: WorkerSettings,
        cancel: CancellationToken,
    ) -> (Worker<MemorySink>, Arc<ProducerStats>) {
        let stats = Arc::new(ProducerStats::default());
        let worker = Worker::new(0, sink, Arc::new(settings), stats.clone(), cancel);
        (worker, stats)
    }

    #[tokio::test]
    async fn test_bounded_worker_submits_exactly_the_limit() {
        let sink = Arc::new(MemorySink::new(5));
        let settings = WorkerSettings::new("txns").with_records_per_worker(100);
        let (worker, stats) = worker(sink.clone(), settings, CancellationToken::new());

        let report = worker.run().await.unwrap();

        assert_eq!(report.submitted, 100);
        assert_eq!(report.delivered, 100);
        assert_eq!(report.failed, 0);
        assert_eq!(stats.snapshot().submitted, 100);

        let records = sink.records();
        assert_eq!(records.len(), 100);
        assert!(records.iter().all(|r| r.topic == "txns"));

        let ids: HashSet<_> = records
            .iter()
            .map(|r| {
                let record: TransactionRecord = serde_json::from_slice(&r.payload).unwrap();
                assert_eq!(record.user_id, r.key);
                record.transaction_id
            })
            .collect();
        assert_eq!(ids.len(), 100);
    }

    #[tokio::test]
    async fn test_cancelled_worker_stops_immediately() {
        let sink = Arc::new(MemorySink::new(1));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (worker, _) = worker(sink.clone(), WorkerSettings::new("txns"), cancel);

        let report = worker.run().await.unwrap();

        assert_eq!(report.submitted, 0);
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failures_are_counted_not_retried() {
        let sink = Arc::new(MemorySink::new(3).rejecting_deliveries());
        let settings = WorkerSettings::new("txns").with_records_per_worker(25);
        let (worker, stats) = worker(sink.clone(), settings, CancellationToken::new());

        let report = worker.run().await.unwrap();

        assert_eq!(report.submitted, 25);
        assert_eq!(report.failed, 25);
        assert_eq!(report.delivered, 0);
        assert_eq!(sink.records().len(), 25);
        assert_eq!(stats.snapshot().failed, 25);
    }

    #[tokio::test]
    async fn test_queue_full_resubmits_same_record() {
        let sink = Arc::new(MemorySink::new(3).queue_full_every(4));
        let settings = WorkerSettings::new("txns").with_records_per_worker(20);
        let (worker, _) = worker(sink.clone(), settings, CancellationToken::new());

        let report = worker.run().await.unwrap();

        assert_eq!(report.submitted, 20);
        assert_eq!(sink.records().len(), 20);
        assert!(sink.rejected_submissions() > 0);
    }

    #[tokio::test]
    async fn test_submission_failure_ends_worker() {
        let sink = Arc::new(MemorySink::new(3).failing_submission(3));
        let settings = WorkerSettings::new("txns").with_records_per_worker(10);
        let (worker, _) = worker(sink.clone(), settings, CancellationToken::new());

        let err = worker.run().await.unwrap_err();

        assert!(matches!(err, ProducerError::Submission(_)));
        assert_eq!(sink.records().len(), 2);
    }

    /// Remembers how many deliveries the pool had observed at each submit call.
    struct ObservingSink {
        inner: MemorySink,
        stats: Arc<ProducerStats>,
        delivered_at_call: Mutex<Vec<u64>>,
    }

    impl RecordSink for ObservingSink {
        fn submit(
            &self,
            topic: &str,
            key: &str,
            payload: &[u8],
        ) -> Result<PendingDelivery, SubmitError> {
            self.delivered_at_call
                .lock()
                .unwrap()
                .push(self.stats.snapshot().delivered);
            self.inner.submit(topic, key, payload)
        }

        fn flush(&self, timeout: Duration) -> Result<(), ProducerError> {
            self.inner.flush(timeout)
        }
    }

    #[tokio::test]
    async fn test_completions_collected_every_poll_interval() {
        let stats = Arc::new(ProducerStats::default());
        let sink = Arc::new(ObservingSink {
            inner: MemorySink::new(3),
            stats: stats.clone(),
            delivered_at_call: Mutex::new(Vec::new()),
        });
        let mut settings = WorkerSettings::new("txns").with_records_per_worker(25);
        settings.poll_interval = 10;
        let worker = Worker::new(
            0,
            sink.clone(),
            Arc::new(settings),
            stats.clone(),
            CancellationToken::new(),
        );

        let report = worker.run().await.unwrap();

        let observed = sink.delivered_at_call.lock().unwrap().clone();
        assert_eq!(observed.len(), 25);
        assert!(observed[..10].iter().all(|&delivered| delivered == 0));
        assert!(observed[10..20].iter().all(|&delivered| delivered == 10));
        assert!(observed[20..].iter().all(|&delivered| delivered == 20));

        // The tail is picked up when the worker settles.
        assert_eq!(report.delivered, 25);
        assert_eq!(stats.snapshot().delivered, 25);
    }

    #[test]
    fn test_settings_validation() {
        assert!(WorkerSettings::new("txns").validate().is_ok());
        assert!(WorkerSettings::new("").validate().is_err());

        let mut settings = WorkerSettings::new("txns");
        settings.poll_interval = 0;
        assert!(settings.validate().is_err());
    }
}
