//! Broker service internals.
//!
//! Request handling lives here; `grpc.rs` only translates between the
//! wire types and these methods. The storage engine is synchronous, so
//! every call into it runs on the blocking thread pool.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use strand_broker::{BrokerResult, Consumer, Producer, TopicRegistry};
use strand_core::{Offset, PartitionId};
use tokio::sync::mpsc;
use tonic::Status;
use tracing::warn;

use crate::error::{ServerError, ServerResult};
use crate::proto::{ConsumeRequest, ConsumeResponse, CreateTopicRequest, NextOffsetRequest, ProduceRequest};

/// How long the consume loop sleeps when it has caught up with the
/// partition tail before polling again.
const TAIL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Buffered responses per consume stream.
const CONSUME_CHANNEL_CAPACITY: usize = 16;

/// The broker service backing the gRPC surface.
pub struct BrokerService {
    registry: Arc<TopicRegistry>,
    producer: Arc<Producer>,
    consumer: Arc<Consumer>,
}

impl BrokerService {
    /// Creates a service over the given registry.
    #[must_use]
    pub fn new(registry: Arc<TopicRegistry>) -> Self {
        let producer = Arc::new(Producer::new(Arc::clone(&registry)));
        let consumer = Arc::new(Consumer::new(Arc::clone(&registry)));
        Self {
            registry,
            producer,
            consumer,
        }
    }

    /// Returns the registry this service serves.
    #[must_use]
    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    pub(crate) async fn create_topic_internal(&self, req: CreateTopicRequest) -> ServerResult<()> {
        let registry = Arc::clone(&self.registry);
        run_blocking(move || registry.create_topic(&req.topic, req.partitions)).await
    }

    pub(crate) async fn produce_internal(
        &self,
        req: ProduceRequest,
    ) -> ServerResult<(PartitionId, Offset)> {
        let producer = Arc::clone(&self.producer);
        let payload = Bytes::from(req.payload);
        let partition = PartitionId::new(req.partition);
        run_blocking(move || producer.produce(&req.topic, partition, &payload)).await
    }

    pub(crate) async fn next_offset_internal(&self, req: NextOffsetRequest) -> ServerResult<Offset> {
        let registry = Arc::clone(&self.registry);
        let partition = PartitionId::new(req.partition);
        run_blocking(move || {
            let target = registry.get_partition(&req.topic, partition)?;
            Ok(target.next_offset())
        })
        .await
    }

    /// Starts a consume loop for the request and returns its response
    /// channel.
    ///
    /// The loop reads records at increasing offsets. At the partition
    /// tail it sleeps briefly and retries; any other error terminates
    /// the stream with a status. A dropped client tears the loop down
    /// through the closed channel.
    pub(crate) async fn consume_stream_internal(
        &self,
        req: ConsumeRequest,
    ) -> ServerResult<mpsc::Receiver<Result<ConsumeResponse, Status>>> {
        // Validate the route up front so bad requests fail the RPC
        // instead of a stream that dies on its first poll.
        let registry = Arc::clone(&self.registry);
        let partition = PartitionId::new(req.partition);
        let topic = req.topic.clone();
        run_blocking(move || registry.get_partition(&topic, partition).map(|_| ())).await?;

        let (tx, rx) = mpsc::channel(CONSUME_CHANNEL_CAPACITY);
        let consumer = Arc::clone(&self.consumer);

        tokio::spawn(async move {
            let mut offset = req.offset;
            loop {
                let consumer = Arc::clone(&consumer);
                let topic = req.topic.clone();
                let read = tokio::task::spawn_blocking(move || {
                    consumer.consume(&topic, partition, Offset::new(offset))
                })
                .await;

                match read {
                    Ok(Ok(record)) => {
                        let response = ConsumeResponse {
                            offset: record.offset.get(),
                            payload: record.payload.to_vec(),
                        };
                        if tx.send(Ok(response)).await.is_err() {
                            break;
                        }
                        offset = record.offset.get() + 1;
                    }
                    Ok(Err(e)) if e.is_past_end() => {
                        if tx.is_closed() {
                            break;
                        }
                        tokio::time::sleep(TAIL_POLL_INTERVAL).await;
                    }
                    Ok(Err(e)) => {
                        let err = ServerError::from(e);
                        warn!(
                            topic = %req.topic,
                            partition = %partition,
                            offset,
                            error = %err,
                            "consume stream failed"
                        );
                        let _ = tx.send(Err(err.to_status())).await;
                        break;
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(Status::internal(format!("consume task failed: {e}"))))
                            .await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Runs a blocking broker operation on the blocking thread pool.
async fn run_blocking<T, F>(op: F) -> ServerResult<T>
where
    F: FnOnce() -> BrokerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ServerError::Internal {
            message: format!("blocking task failed: {e}"),
        })?
        .map_err(ServerError::from)
}
