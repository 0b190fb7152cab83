//! Topic bootstrap.
//!
//! The target topic must exist before any worker starts. [`ensure_topic`]
//! checks broker metadata, creates the topic when it is missing and treats a
//! concurrent "already exists" answer as success, so running it repeatedly
//! against the same cluster is harmless.

use crate::error::ProducerError;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, error, info};

/// Name, partition count and replication factor of a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i32,
}

/// What the bootstrap found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicOutcome {
    Created,
    AlreadyExists,
}

/// Cluster administration needed by the bootstrap.
#[async_trait]
pub trait TopicAdmin: Send + Sync {
    /// Whether the broker metadata lists `topic`.
    async fn topic_exists(&self, topic: &str) -> Result<bool, ProducerError>;

    /// Request creation of a topic and wait for the broker's answer.
    async fn create_topic(&self, spec: &TopicSpec) -> Result<TopicOutcome, ProducerError>;
}

/// [`TopicAdmin`] backed by an rdkafka admin client.
pub struct KafkaTopicAdmin {
    client: AdminClient<DefaultClientContext>,
    metadata_timeout: Duration,
    operation_timeout: Duration,
}

impl KafkaTopicAdmin {
    pub fn new(
        brokers: &str,
        metadata_timeout: Duration,
        operation_timeout: Duration,
    ) -> Result<Self, ProducerError> {
        let client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .create()
            .map_err(ProducerError::Kafka)?;

        Ok(Self {
            client,
            metadata_timeout,
            operation_timeout,
        })
    }
}

#[async_trait]
impl TopicAdmin for KafkaTopicAdmin {
    async fn topic_exists(&self, topic: &str) -> Result<bool, ProducerError> {
        // Listing every topic avoids triggering broker-side auto creation.
        let exists = tokio::task::block_in_place(|| {
            self.client
                .inner()
                .fetch_metadata(None, self.metadata_timeout)
                .map(|metadata| metadata.topics().iter().any(|t| t.name() == topic))
        })?;
        Ok(exists)
    }

    async fn create_topic(&self, spec: &TopicSpec) -> Result<TopicOutcome, ProducerError> {
        let new_topic = NewTopic::new(
            &spec.name,
            spec.partitions,
            TopicReplication::Fixed(spec.replication_factor),
        );
        let opts = AdminOptions::new().operation_timeout(Some(self.operation_timeout));

        let results = self
            .client
            .create_topics(&[new_topic], &opts)
            .await
            .map_err(|e| ProducerError::TopicCreation(format!("Failed to create topic: {e}")))?;

        let mut outcome = TopicOutcome::Created;
        for result in results {
            match result {
                Ok(_) => {}
                Err((_, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    outcome = TopicOutcome::AlreadyExists;
                }
                Err((topic_name, code)) => {
                    return Err(ProducerError::TopicCreation(format!(
                        "Failed to create topic {topic_name}: {code}"
                    )));
                }
            }
        }
        Ok(outcome)
    }
}

/// Make sure the topic exists, retrying the whole check-then-create sequence
/// according to `policy`.
pub async fn ensure_topic<A>(
    admin: &A,
    spec: &TopicSpec,
    policy: &RetryPolicy,
) -> Result<TopicOutcome, ProducerError>
where
    A: TopicAdmin + ?Sized,
{
    policy
        .run("Topic bootstrap", |attempt| async move {
            debug!("Ensuring topic '{}' exists (attempt {attempt})", spec.name);
            ensure_topic_once(admin, spec)
                .await
                .inspect_err(|e| error!("Error creating topic '{}': {e}", spec.name))
        })
        .await
}

async fn ensure_topic_once<A>(admin: &A, spec: &TopicSpec) -> Result<TopicOutcome, ProducerError>
where
    A: TopicAdmin + ?Sized,
{
    if admin.topic_exists(&spec.name).await? {
        info!("Topic '{}' already exists", spec.name);
        return Ok(TopicOutcome::AlreadyExists);
    }

    let outcome = admin.create_topic(spec).await?;
    match outcome {
        TopicOutcome::Created => info!(
            partitions = spec.partitions,
            replication_factor = spec.replication_factor,
            "Topic '{}' created successfully",
            spec.name
        ),
        TopicOutcome::AlreadyExists => {
            info!("Topic '{}' was created concurrently", spec.name)
        }
    }
    Ok(outcome)
}
