//! The shared producer handle workers submit records through.

use crate::args::ProducerTuningArgs;
use crate::error::{DeliveryError, ProducerError};
use futures::future::BoxFuture;
use futures::FutureExt;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::ClientConfig;
use std::time::Duration;

/// A record the broker acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub key: String,
}

/// Completion of one submitted record. Resolves once the broker accepted or
/// rejected it; independent of the submitting call.
pub type PendingDelivery = BoxFuture<'static, Result<DeliveryReport, DeliveryError>>;

/// Why a record could not be handed to the client.
#[derive(Debug)]
pub enum SubmitError {
    /// The client's local queue is full; the same record may be resubmitted.
    QueueFull,
    Failed(ProducerError),
}

/// Outbound client handle shared by every worker of a pool.
///
/// Implementations must accept concurrent submissions from many tasks; the
/// workers take no locks around `submit`.
pub trait RecordSink: Send + Sync + 'static {
    fn submit(&self, topic: &str, key: &str, payload: &[u8])
        -> Result<PendingDelivery, SubmitError>;

    /// Block until queued records are delivered or `timeout` elapses.
    fn flush(&self, timeout: Duration) -> Result<(), ProducerError>;
}

/// Build the producer configuration from the tuning knobs.
///
/// Entries of `producer_config` are applied last and override the named knobs.
pub fn producer_config(brokers: &str, tuning: &ProducerTuningArgs) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", brokers)
        .set(
            "queue.buffering.max.messages",
            tuning.queue_buffering_max_messages.to_string(),
        )
        .set(
            "queue.buffering.max.kbytes",
            tuning.queue_buffering_max_kbytes.to_string(),
        )
        .set("batch.num.messages", tuning.batch_num_messages.to_string())
        .set("linger.ms", tuning.linger_ms.to_string())
        .set("acks", tuning.acks.as_str())
        .set("compression.type", tuning.compression_type.as_str())
        .set("message.timeout.ms", tuning.message_timeout_ms.to_string());

    for (key, value) in &tuning.producer_config {
        config.set(key.as_str(), value.as_str());
    }
    config
}

/// [`RecordSink`] over an rdkafka `FutureProducer`.
///
/// librdkafka's producer is thread-safe; the handle is shared behind an `Arc`
/// and delivery reports are served by the client's own background thread.
pub struct KafkaRecordSink {
    producer: FutureProducer,
}

impl KafkaRecordSink {
    pub fn new(config: &ClientConfig) -> Result<Self, ProducerError> {
        let producer: FutureProducer = config.create().map_err(ProducerError::Kafka)?;
        Ok(Self { producer })
    }
}

impl RecordSink for KafkaRecordSink {
    fn submit(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<PendingDelivery, SubmitError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send_result(record) {
            Ok(delivery) => {
                let key = key.to_string();
                Ok(async move {
                    match delivery.await {
                        Ok(Ok(_)) => Ok(DeliveryReport { key }),
                        Ok(Err((err, _message))) => Err(DeliveryError::Rejected {
                            key,
                            reason: err.to_string(),
                        }),
                        Err(_canceled) => Err(DeliveryError::Canceled { key }),
                    }
                }
                .boxed())
            }
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                Err(SubmitError::QueueFull)
            }
            Err((err, _)) => Err(SubmitError::Failed(ProducerError::Kafka(err))),
        }
    }

    fn flush(&self, timeout: Duration) -> Result<(), ProducerError> {
        tokio::task::block_in_place(|| self.producer.flush(timeout))?;
        Ok(())
    }
}
