//! Command-line interface for txn-loadgen
//!
//! Creates the target topic if needed, then runs a pool of producer workers
//! that publish synthetic financial transactions until interrupted.
//!
//! # Usage Examples
//!
//! ```bash
//! # Run 8 workers against the default three-broker cluster until Ctrl+C
//! txn-loadgen
//!
//! # Bounded run: one worker, 100 records, single local broker
//! txn-loadgen --brokers localhost:9092 --replication-factor 1 \
//!   --workers 1 --records-per-worker 100
//!
//! # Override librdkafka settings
//! txn-loadgen --compression-type zstd --producer-config enable.idempotence=true
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`); per-record delivery
//! results are logged at `debug`.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use transaction_producer::{
    ensure_topic, producer_config, KafkaArgs, KafkaRecordSink, KafkaTopicAdmin,
    PoolReport, ProducerTuningArgs, TopicArgs, WorkerArgs, WorkerPool,
};

mod shutdown;

#[derive(Parser)]
#[command(name = "txn-loadgen")]
#[command(about = "Publish synthetic financial transactions to a Kafka topic")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    kafka: KafkaArgs,

    #[command(flatten)]
    topic: TopicArgs,

    #[command(flatten)]
    tuning: ProducerTuningArgs,

    #[command(flatten)]
    workers: WorkerArgs,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // One runtime thread per worker plus one for the signal listener.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cli.workers.workers as usize + 1)
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let spec = cli.topic.topic_spec();

    info!(
        brokers = %cli.kafka.brokers,
        partitions = spec.partitions,
        replication_factor = spec.replication_factor,
        "Bootstrapping topic '{}'",
        spec.name
    );
    let admin = KafkaTopicAdmin::new(
        &cli.kafka.brokers,
        cli.topic.metadata_timeout(),
        cli.topic.operation_timeout(),
    )
    .context("Failed to create Kafka admin client")?;
    ensure_topic(&admin, &spec, &cli.topic.retry_policy())
        .await
        .with_context(|| format!("Failed to bootstrap topic '{}'", spec.name))?;
    drop(admin);

    let sink = KafkaRecordSink::new(&producer_config(&cli.kafka.brokers, &cli.tuning))
        .context("Failed to create Kafka producer")?;

    let cancel = CancellationToken::new();
    let signal_listener = shutdown::cancel_on_signal(cancel.clone());

    let pool = WorkerPool::new(Arc::new(sink), cli.workers.settings(&spec.name))
        .with_flush_timeout(cli.workers.flush_timeout());
    let report = pool
        .run_workers(cli.workers.workers as usize, cancel.clone())
        .await
        .context("Producer pool failed")?;

    shutdown::release(cancel, signal_listener).await;

    check_report(&report)
}

/// A run fails when no worker stopped cleanly.
fn check_report(report: &PoolReport) -> anyhow::Result<()> {
    if report.completed.is_empty() {
        anyhow::bail!("All {} workers stopped with an error", report.workers);
    }
    if report.failed_workers > 0 {
        warn!(
            "{} of {} workers stopped with an error",
            report.failed_workers, report.workers
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use transaction_producer::WorkerReport;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bounded_run_arguments() {
        let cli = Cli::try_parse_from([
            "txn-loadgen",
            "--brokers",
            "localhost:9092",
            "--replication-factor",
            "1",
            "--workers",
            "1",
            "--records-per-worker",
            "100",
        ])
        .unwrap();

        assert_eq!(cli.kafka.brokers, "localhost:9092");
        assert_eq!(cli.topic.topic_spec().replication_factor, 1);
        assert_eq!(cli.workers.workers, 1);
        assert_eq!(
            cli.workers.settings(&cli.topic.topic).records_per_worker,
            Some(100)
        );
    }

    #[test]
    fn test_run_fails_when_every_worker_failed() {
        let report = PoolReport {
            workers: 2,
            failed_workers: 2,
            ..PoolReport::default()
        };
        assert!(check_report(&report).is_err());
    }

    #[test]
    fn test_run_succeeds_when_some_worker_completed() {
        let report = PoolReport {
            workers: 2,
            completed: vec![WorkerReport {
                worker_id: 1,
                submitted: 100,
                delivered: 100,
                failed: 0,
            }],
            failed_workers: 1,
            ..PoolReport::default()
        };
        assert!(check_report(&report).is_ok());
    }
}
