//! Error types for the transaction producer.

use thiserror::Error;
use transaction_generator::RecordError;

/// Errors that can occur while bootstrapping the topic or producing records.
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Topic creation error: {0}")]
    TopicCreation(String),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Outcome of a single record that the broker did not accept.
///
/// Delivery errors are reported through the record's completion and logged;
/// they never abort the worker that submitted the record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Delivery failed for record {key}: {reason}")]
    Rejected { key: String, reason: String },

    #[error("Delivery of record {key} was cancelled before completion")]
    Canceled { key: String },
}
