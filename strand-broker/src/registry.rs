//! Topic registry.
//!
//! The registry maps topic names to their partitions. It starts empty
//! and pointing at a data root; creating a topic opens (or reattaches
//! to) `<data_root>/<topic>/partition<id>` directories on disk, so a
//! restarted process reclaims its log by re-creating its topics.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use strand_core::limits::{PARTITIONS_PER_TOPIC_MAX, TOPIC_NAME_BYTES_MAX};
use strand_core::PartitionId;
use strand_log::{LogConfig, Partition};
use tracing::info;

use crate::error::{BrokerError, BrokerResult};

/// One registered topic.
#[derive(Debug)]
struct Topic {
    /// Partitions indexed by partition id.
    partitions: Vec<Arc<Partition>>,
}

/// Registry of all topics owned by this broker process.
#[derive(Debug)]
pub struct TopicRegistry {
    /// Root directory all topic data lives under.
    data_dir: PathBuf,
    /// Storage configuration applied to every partition.
    config: LogConfig,
    /// Registered topics by name.
    topics: RwLock<HashMap<String, Topic>>,
}

impl TopicRegistry {
    /// Creates an empty registry rooted at `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>, config: LogConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            config,
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the data root this registry stores topics under.
    #[must_use]
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Creates a topic with `partitions` partitions, opening each
    /// partition directory (and any data already in it).
    ///
    /// # Errors
    /// Fails with [`BrokerError::TopicAlreadyExists`] for duplicate
    /// names, [`BrokerError::InvalidTopicName`] /
    /// [`BrokerError::InvalidPartitionCount`] for bad arguments, and
    /// surfaces storage errors. If any partition fails to open, the ones
    /// already opened by this call are closed and the topic is not
    /// registered.
    pub fn create_topic(&self, name: &str, partitions: u32) -> BrokerResult<()> {
        validate_topic_name(name)?;
        if partitions == 0 {
            return Err(BrokerError::InvalidPartitionCount {
                count: partitions,
                reason: "must be at least 1",
            });
        }
        if partitions > PARTITIONS_PER_TOPIC_MAX {
            return Err(BrokerError::InvalidPartitionCount {
                count: partitions,
                reason: "exceeds partitions-per-topic maximum",
            });
        }

        let mut topics = self.topics.write();
        if topics.contains_key(name) {
            return Err(BrokerError::TopicAlreadyExists {
                topic: name.to_string(),
            });
        }

        let mut opened: Vec<Arc<Partition>> = Vec::with_capacity(partitions as usize);
        for id in 0..partitions {
            match Partition::open(&self.data_dir, name, PartitionId::new(id), self.config) {
                Ok(partition) => opened.push(Arc::new(partition)),
                Err(e) => {
                    for partition in &opened {
                        let _ = partition.close();
                    }
                    return Err(e.into());
                }
            }
        }

        info!(topic = %name, partitions, "created topic");
        topics.insert(name.to_string(), Topic { partitions: opened });
        Ok(())
    }

    /// Looks up a partition by topic name and partition id.
    ///
    /// # Errors
    /// Fails with [`BrokerError::TopicNotFound`] for unknown topics and
    /// [`BrokerError::PartitionOutOfRange`] for ids outside
    /// `[0, partitions)`.
    pub fn get_partition(&self, topic: &str, id: PartitionId) -> BrokerResult<Arc<Partition>> {
        let topics = self.topics.read();
        let entry = topics.get(topic).ok_or_else(|| BrokerError::TopicNotFound {
            topic: topic.to_string(),
        })?;

        let count = u32::try_from(entry.partitions.len()).unwrap_or(u32::MAX);
        entry
            .partitions
            .get(id.get() as usize)
            .cloned()
            .ok_or_else(|| BrokerError::PartitionOutOfRange {
                topic: topic.to_string(),
                partition: id.get(),
                partitions: count,
            })
    }

    /// Returns how many partitions a topic has.
    ///
    /// # Errors
    /// Fails with [`BrokerError::TopicNotFound`] for unknown topics.
    pub fn partition_count(&self, topic: &str) -> BrokerResult<u32> {
        let topics = self.topics.read();
        let entry = topics.get(topic).ok_or_else(|| BrokerError::TopicNotFound {
            topic: topic.to_string(),
        })?;
        Ok(u32::try_from(entry.partitions.len()).unwrap_or(u32::MAX))
    }

    /// Flushes and closes every partition of every topic. Idempotent.
    ///
    /// # Errors
    /// Returns the first close failure after attempting to close
    /// everything.
    pub fn close(&self) -> BrokerResult<()> {
        let topics = self.topics.write();
        let mut result = Ok(());
        for (name, topic) in topics.iter() {
            for partition in &topic.partitions {
                if let Err(e) = partition.close() {
                    if result.is_ok() {
                        result = Err(e.into());
                    }
                }
            }
            info!(topic = %name, "closed topic");
        }
        result
    }
}

/// Topic names become directory names, so they are restricted to a safe
/// character set.
fn validate_topic_name(name: &str) -> BrokerResult<()> {
    let invalid = |reason| {
        Err(BrokerError::InvalidTopicName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name.len() > TOPIC_NAME_BYTES_MAX {
        return invalid("exceeds maximum length");
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
    {
        return invalid("may only contain [A-Za-z0-9._-]");
    }
    Ok(())
}
