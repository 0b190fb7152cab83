//! In-memory stand-ins for the Kafka admin and producer clients.
//!
//! Used by the unit and integration tests so that the bootstrap and the
//! worker pool can be exercised without a broker.

use crate::admin::{TopicAdmin, TopicOutcome, TopicSpec};
use crate::error::{DeliveryError, ProducerError};
use crate::sink::{DeliveryReport, PendingDelivery, RecordSink, SubmitError};
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A record accepted by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedRecord {
    /// Global submission order across all workers.
    pub sequence: u64,
    pub topic: String,
    pub key: String,
    pub partition: u32,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct SinkState {
    calls: u64,
    rejected: u64,
    flushes: u32,
    records: Vec<SubmittedRecord>,
    partition_logs: HashMap<u32, Vec<SubmittedRecord>>,
}

/// [`RecordSink`] that keeps every submission in memory.
///
/// Partitions are assigned from a hash of the key, so records of one key
/// always share a partition, and deliveries resolve immediately.
pub struct MemorySink {
    partitions: u32,
    reject_deliveries: bool,
    queue_full_every: Option<u64>,
    failing_call: Option<u64>,
    state: Mutex<SinkState>,
}

impl MemorySink {
    pub fn new(partitions: u32) -> Self {
        Self {
            partitions: partitions.max(1),
            reject_deliveries: false,
            queue_full_every: None,
            failing_call: None,
            state: Mutex::new(SinkState::default()),
        }
    }

    /// Accept every submission but report each delivery as failed.
    pub fn rejecting_deliveries(mut self) -> Self {
        self.reject_deliveries = true;
        self
    }

    /// Answer every `n`-th submit call with a full queue.
    pub fn queue_full_every(mut self, n: u64) -> Self {
        self.queue_full_every = Some(n.max(1));
        self
    }

    /// Fail the `n`-th submit call (1-based) with a non-recoverable error.
    pub fn failing_submission(mut self, n: u64) -> Self {
        self.failing_call = Some(n);
        self
    }

    pub fn partition_for(&self, key: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % u64::from(self.partitions)) as u32
    }

    /// All accepted records in submission order.
    pub fn records(&self) -> Vec<SubmittedRecord> {
        self.state().records.clone()
    }

    /// Accepted records of one partition, in the order they were appended.
    pub fn partition_log(&self, partition: u32) -> Vec<SubmittedRecord> {
        self.state()
            .partition_logs
            .get(&partition)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of submit calls answered with a full queue.
    pub fn rejected_submissions(&self) -> u64 {
        self.state().rejected
    }

    pub fn flush_count(&self) -> u32 {
        self.state().flushes
    }

    fn state(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordSink for MemorySink {
    fn submit(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<PendingDelivery, SubmitError> {
        let partition = self.partition_for(key);
        let mut state = self.state();
        state.calls += 1;

        if self.failing_call == Some(state.calls) {
            return Err(SubmitError::Failed(ProducerError::Submission(format!(
                "injected failure on submit call {}",
                state.calls
            ))));
        }
        if self
            .queue_full_every
            .is_some_and(|n| state.calls % n == 0)
        {
            state.rejected += 1;
            return Err(SubmitError::QueueFull);
        }

        let record = SubmittedRecord {
            sequence: state.records.len() as u64,
            topic: topic.to_string(),
            key: key.to_string(),
            partition,
            payload: payload.to_vec(),
        };
        state
            .partition_logs
            .entry(partition)
            .or_default()
            .push(record.clone());
        state.records.push(record);

        let key = key.to_string();
        let outcome = if self.reject_deliveries {
            Err(DeliveryError::Rejected {
                key,
                reason: "Broker: injected rejection".to_string(),
            })
        } else {
            Ok(DeliveryReport { key })
        };
        Ok(futures::future::ready(outcome).boxed())
    }

    fn flush(&self, _timeout: Duration) -> Result<(), ProducerError> {
        self.state().flushes += 1;
        Ok(())
    }
}

/// [`TopicAdmin`] over an in-memory topic table.
#[derive(Default)]
pub struct MemoryTopicAdmin {
    topics: Mutex<HashMap<String, TopicSpec>>,
    unreachable: bool,
    racing_creator: bool,
    failing_first: u32,
    metadata_calls: AtomicU32,
    create_calls: AtomicU32,
}

impl MemoryTopicAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topic(self, spec: TopicSpec) -> Self {
        self.topics_guard().insert(spec.name.clone(), spec);
        self
    }

    /// Every metadata request fails.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// The first `n` metadata requests fail.
    pub fn failing_first(mut self, n: u32) -> Self {
        self.failing_first = n;
        self
    }

    /// Another client creates the topic between the metadata check and the
    /// creation request.
    pub fn racing_creator(mut self) -> Self {
        self.racing_creator = true;
        self
    }

    pub fn topic(&self, name: &str) -> Option<TopicSpec> {
        self.topics_guard().get(name).cloned()
    }

    pub fn metadata_calls(&self) -> u32 {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn topics_guard(&self) -> MutexGuard<'_, HashMap<String, TopicSpec>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TopicAdmin for MemoryTopicAdmin {
    async fn topic_exists(&self, topic: &str) -> Result<bool, ProducerError> {
        let call = self.metadata_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.unreachable || call <= self.failing_first {
            return Err(ProducerError::TopicCreation(
                "Failed to fetch metadata: broker transport failure".to_string(),
            ));
        }
        Ok(self.topics_guard().contains_key(topic))
    }

    async fn create_topic(&self, spec: &TopicSpec) -> Result<TopicOutcome, ProducerError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut topics = self.topics_guard();

        if self.racing_creator || topics.contains_key(&spec.name) {
            topics.entry(spec.name.clone()).or_insert_with(|| spec.clone());
            return Ok(TopicOutcome::AlreadyExists);
        }
        topics.insert(spec.name.clone(), spec.clone());
        Ok(TopicOutcome::Created)
    }
}
