//! Consumer collaborator.
//!
//! Reads records through the registry and remembers, per
//! `(topic, partition)`, the offset after the last record handed out.
//! Positions are in-memory only: a restarted consumer starts wherever
//! its caller tells it to.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use strand_core::{Offset, PartitionId, Record};

use crate::error::BrokerResult;
use crate::registry::TopicRegistry;

/// Reads records and tracks consume positions.
#[derive(Debug)]
pub struct Consumer {
    registry: Arc<TopicRegistry>,
    /// Next offset to hand out, keyed by topic and partition. Keying on
    /// the structured pair keeps distinct partitions from colliding.
    positions: RwLock<HashMap<(String, PartitionId), Offset>>,
}

impl Consumer {
    /// Creates a consumer over the given registry.
    #[must_use]
    pub fn new(registry: Arc<TopicRegistry>) -> Self {
        Self {
            registry,
            positions: RwLock::new(HashMap::new()),
        }
    }

    /// Reads the record at `offset` and advances the tracked position for
    /// this `(topic, partition)` to `offset + 1`.
    ///
    /// # Errors
    /// Surfaces registry lookup and storage errors; the position is not
    /// advanced on failure.
    pub fn consume(
        &self,
        topic: &str,
        partition: PartitionId,
        offset: Offset,
    ) -> BrokerResult<Record> {
        let target = self.registry.get_partition(topic, partition)?;
        let record = target.read(offset)?;

        self.positions
            .write()
            .insert((topic.to_string(), partition), offset.next());

        Ok(record)
    }

    /// Returns the tracked position for a `(topic, partition)`, if any
    /// record has been consumed from it.
    #[must_use]
    pub fn position(&self, topic: &str, partition: PartitionId) -> Option<Offset> {
        self.positions
            .read()
            .get(&(topic.to_string(), partition))
            .copied()
    }
}
