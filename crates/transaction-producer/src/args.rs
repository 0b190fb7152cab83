//! CLI argument definitions for the transaction load generator.

use crate::admin::TopicSpec;
use crate::retry::RetryPolicy;
use crate::worker::WorkerSettings;
use clap::Args;
use std::time::Duration;

/// Broker list used when none is given.
pub const DEFAULT_BROKERS: &str = "localhost:19092,localhost:29092,localhost:39092";

/// Topic the records are published to.
pub const DEFAULT_TOPIC: &str = "financial_transactions";

/// Kafka connection arguments.
#[derive(Args, Clone, Debug)]
pub struct KafkaArgs {
    /// Kafka brokers (comma-separated host:port list)
    #[arg(long, env = "KAFKA_BROKERS", default_value = DEFAULT_BROKERS)]
    pub brokers: String,
}

/// Target topic and bootstrap behaviour.
#[derive(Args, Clone, Debug)]
pub struct TopicArgs {
    /// Topic to create and produce to
    #[arg(long, env = "LOADGEN_TOPIC_NAME", default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Partition count used when the topic is created
    #[arg(long, env = "LOADGEN_TOPIC_PARTITIONS", default_value_t = 5, value_parser = clap::value_parser!(i32).range(1..))]
    pub partitions: i32,

    /// Replication factor used when the topic is created
    #[arg(long, env = "LOADGEN_TOPIC_REPLICATION_FACTOR", default_value_t = 3, value_parser = clap::value_parser!(i32).range(1..))]
    pub replication_factor: i32,

    /// Total attempts for the topic bootstrap before giving up
    #[arg(long, env = "LOADGEN_BOOTSTRAP_ATTEMPTS", default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub bootstrap_attempts: u32,

    /// Delay before the second bootstrap attempt, doubled on every retry
    #[arg(long, env = "LOADGEN_BOOTSTRAP_INITIAL_BACKOFF_MS", default_value_t = 1000)]
    pub bootstrap_initial_backoff_ms: u64,

    /// Upper bound on the delay between bootstrap attempts
    #[arg(long, env = "LOADGEN_BOOTSTRAP_MAX_BACKOFF_MS", default_value_t = 10000)]
    pub bootstrap_max_backoff_ms: u64,

    /// Timeout for the broker metadata request
    #[arg(long, env = "LOADGEN_METADATA_TIMEOUT_MS", default_value_t = 10000)]
    pub metadata_timeout_ms: u64,

    /// Broker-side timeout for the topic creation request
    #[arg(long, env = "LOADGEN_TOPIC_OPERATION_TIMEOUT_MS", default_value_t = 10000)]
    pub topic_operation_timeout_ms: u64,
}

impl TopicArgs {
    pub fn topic_spec(&self) -> TopicSpec {
        TopicSpec {
            name: self.topic.clone(),
            partitions: self.partitions,
            replication_factor: self.replication_factor,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.bootstrap_attempts,
            initial_backoff: Duration::from_millis(self.bootstrap_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.bootstrap_max_backoff_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.topic_operation_timeout_ms)
    }
}

/// librdkafka producer tuning. These trade throughput against latency and
/// do not change what is produced.
#[derive(Args, Clone, Debug)]
pub struct ProducerTuningArgs {
    /// Maximum number of messages buffered by the client
    #[arg(long, env = "LOADGEN_QUEUE_BUFFERING_MAX_MESSAGES", default_value_t = 1_000_000)]
    pub queue_buffering_max_messages: u64,

    /// Maximum size of the client buffer in kilobytes
    #[arg(long, env = "LOADGEN_QUEUE_BUFFERING_MAX_KBYTES", default_value_t = 1_048_576)]
    pub queue_buffering_max_kbytes: u64,

    /// Maximum number of messages per batch
    #[arg(long, env = "LOADGEN_BATCH_NUM_MESSAGES", default_value_t = 10_000)]
    pub batch_num_messages: u64,

    /// Time to wait for a batch to fill up
    #[arg(long, env = "LOADGEN_LINGER_MS", default_value_t = 100)]
    pub linger_ms: u64,

    /// Acknowledgements required from the broker (0, 1 or all)
    #[arg(long, env = "LOADGEN_ACKS", default_value = "1")]
    pub acks: String,

    /// Compression codec (none, gzip, snappy, lz4, zstd)
    #[arg(long, env = "LOADGEN_COMPRESSION_TYPE", default_value = "lz4")]
    pub compression_type: String,

    /// Local delivery timeout for a single message
    #[arg(long, env = "LOADGEN_MESSAGE_TIMEOUT_MS", default_value_t = 30_000)]
    pub message_timeout_ms: u64,

    /// Extra librdkafka properties (key=value), applied after the options above
    #[arg(long = "producer-config", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub producer_config: Vec<(String, String)>,
}

impl Default for ProducerTuningArgs {
    fn default() -> Self {
        Self {
            queue_buffering_max_messages: 1_000_000,
            queue_buffering_max_kbytes: 1_048_576,
            batch_num_messages: 10_000,
            linger_ms: 100,
            acks: "1".to_string(),
            compression_type: "lz4".to_string(),
            message_timeout_ms: 30_000,
            producer_config: Vec::new(),
        }
    }
}

/// Worker pool arguments.
#[derive(Args, Clone, Debug)]
pub struct WorkerArgs {
    /// Number of concurrent producer workers
    #[arg(long, env = "LOADGEN_WORKERS", default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    pub workers: u32,

    /// Stop each worker after this many records (runs until interrupted when unset)
    #[arg(long, env = "LOADGEN_RECORDS_PER_WORKER")]
    pub records_per_worker: Option<u64>,

    /// Random seed for reproducible records (entropy-seeded when unset)
    #[arg(long, env = "LOADGEN_SEED")]
    pub seed: Option<u64>,

    /// Log worker progress every N submissions
    #[arg(long, env = "LOADGEN_PROGRESS_INTERVAL", default_value_t = 10_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub progress_interval: u64,

    /// Collect delivery completions and yield every N submissions
    #[arg(long, env = "LOADGEN_POLL_INTERVAL", default_value_t = 50_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,

    /// How long to wait for queued records on shutdown
    #[arg(long, env = "LOADGEN_FLUSH_TIMEOUT_MS", default_value_t = 30_000)]
    pub flush_timeout_ms: u64,
}

impl WorkerArgs {
    pub fn settings(&self, topic: &str) -> WorkerSettings {
        WorkerSettings {
            topic: topic.to_string(),
            records_per_worker: self.records_per_worker,
            seed: self.seed,
            progress_interval: self.progress_interval,
            poll_interval: self.poll_interval,
        }
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
