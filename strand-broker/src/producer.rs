//! Producer collaborator.

use std::sync::Arc;

use bytes::Bytes;
use strand_core::{Offset, PartitionId};
use tracing::debug;

use crate::error::BrokerResult;
use crate::registry::TopicRegistry;

/// Routes appends to the right partition through the registry.
#[derive(Debug)]
pub struct Producer {
    registry: Arc<TopicRegistry>,
}

impl Producer {
    /// Creates a producer over the given registry.
    #[must_use]
    pub const fn new(registry: Arc<TopicRegistry>) -> Self {
        Self { registry }
    }

    /// Appends `payload` to the given partition and returns the partition
    /// it landed on together with its assigned offset.
    ///
    /// # Errors
    /// Surfaces registry lookup and storage errors.
    pub fn produce(
        &self,
        topic: &str,
        partition: PartitionId,
        payload: &Bytes,
    ) -> BrokerResult<(PartitionId, Offset)> {
        let target = self.registry.get_partition(topic, partition)?;
        let offset = target.append(payload)?;
        debug!(topic = %topic, partition = %partition, offset = %offset, "produced record");
        Ok((partition, offset))
    }
}
