//! Topic bootstrap and parallel Kafka producers for txn-loadgen.
//!
//! # Architecture
//!
//! ```text
//!   ensure_topic ──► TopicAdmin (KafkaTopicAdmin)
//!        │             check metadata, create if missing, retried
//!        ▼
//!   WorkerPool::run_workers(n, cancel)
//!        │
//!        ├── Worker 0 ──┐
//!        ├── Worker 1 ──┤   TransactionGenerator → JSON → submit(key = userId)
//!        └── Worker n ──┘
//!                       │
//!                       ▼
//!              Arc<RecordSink> (KafkaRecordSink / FutureProducer)
//!                       │
//!                       ▼
//!                  Kafka topic
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use transaction_producer::{
//!     ensure_topic, producer_config, KafkaRecordSink, KafkaTopicAdmin, ProducerTuningArgs,
//!     RetryPolicy, TopicSpec, WorkerPool, WorkerSettings,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let brokers = "localhost:9092";
//!     let spec = TopicSpec {
//!         name: "financial_transactions".to_string(),
//!         partitions: 5,
//!         replication_factor: 3,
//!     };
//!     let admin = KafkaTopicAdmin::new(brokers, Duration::from_secs(10), Duration::from_secs(10))?;
//!     ensure_topic(&admin, &spec, &RetryPolicy::default()).await?;
//!
//!     let sink = Arc::new(KafkaRecordSink::new(&producer_config(
//!         brokers,
//!         &ProducerTuningArgs::default(),
//!     ))?);
//!     let pool = WorkerPool::new(sink, WorkerSettings::new(spec.name.clone()));
//!     pool.run_workers(8, CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod args;
pub mod error;
pub mod pool;
pub mod retry;
pub mod sink;
pub mod testing;
pub mod worker;

// Re-exports for convenience
pub use admin::{ensure_topic, KafkaTopicAdmin, TopicAdmin, TopicOutcome, TopicSpec};
pub use args::{KafkaArgs, ProducerTuningArgs, TopicArgs, WorkerArgs};
pub use error::{DeliveryError, ProducerError};
pub use pool::{PoolReport, WorkerPool};
pub use retry::RetryPolicy;
pub use sink::{
    producer_config, DeliveryReport, KafkaRecordSink, PendingDelivery, RecordSink, SubmitError,
};
pub use worker::{ProducerStats, StatsSnapshot, Worker, WorkerReport, WorkerSettings};

#[cfg(test)]
mod tests {
    #[test]
    fn test_package_license() {
        assert_eq!(env!("CARGO_PKG_LICENSE"), "MIT");
    }
}
