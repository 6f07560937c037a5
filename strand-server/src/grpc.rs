//! gRPC service trait implementation.
//!
//! Translates wire requests to [`BrokerService`] methods. Data-plane
//! failures are reported in-band through the response's `error_code`;
//! only stream setup and teardown use transport-level statuses.

use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

use crate::proto::broker_server::Broker;
use crate::proto::{
    ConsumeRequest, ConsumeResponse, CreateTopicRequest, CreateTopicResponse, ErrorCode,
    NextOffsetRequest, NextOffsetResponse, ProduceRequest, ProduceResponse,
};
use crate::service::BrokerService;

#[tonic::async_trait]
impl Broker for BrokerService {
    async fn create_topic(
        &self,
        request: Request<CreateTopicRequest>,
    ) -> Result<Response<CreateTopicResponse>, Status> {
        let inner = request.into_inner();
        debug!(topic = %inner.topic, partitions = inner.partitions, "CreateTopic request");

        match self.create_topic_internal(inner).await {
            Ok(()) => Ok(Response::new(CreateTopicResponse {
                error_code: ErrorCode::None.into(),
                error_message: None,
            })),
            Err(e) => {
                warn!(error = %e, "CreateTopic failed");
                Ok(Response::new(CreateTopicResponse {
                    error_code: e.to_error_code().into(),
                    error_message: Some(e.message()),
                }))
            }
        }
    }

    async fn produce(
        &self,
        request: Request<ProduceRequest>,
    ) -> Result<Response<ProduceResponse>, Status> {
        let inner = request.into_inner();
        debug!(
            topic = %inner.topic,
            partition = inner.partition,
            bytes = inner.payload.len(),
            "Produce request"
        );

        match self.produce_internal(inner).await {
            Ok((partition, offset)) => Ok(Response::new(ProduceResponse {
                partition: partition.get(),
                offset: offset.get(),
                error_code: ErrorCode::None.into(),
                error_message: None,
            })),
            Err(e) => {
                warn!(error = %e, "Produce failed");
                Ok(Response::new(ProduceResponse {
                    partition: 0,
                    offset: 0,
                    error_code: e.to_error_code().into(),
                    error_message: Some(e.message()),
                }))
            }
        }
    }

    type ConsumeStream = ReceiverStream<Result<ConsumeResponse, Status>>;

    async fn consume(
        &self,
        request: Request<ConsumeRequest>,
    ) -> Result<Response<Self::ConsumeStream>, Status> {
        let inner = request.into_inner();
        debug!(
            topic = %inner.topic,
            partition = inner.partition,
            offset = inner.offset,
            "Consume request"
        );

        match self.consume_stream_internal(inner).await {
            Ok(rx) => Ok(Response::new(ReceiverStream::new(rx))),
            Err(e) => {
                warn!(error = %e, "Consume failed");
                Err(e.to_status())
            }
        }
    }

    async fn next_offset(
        &self,
        request: Request<NextOffsetRequest>,
    ) -> Result<Response<NextOffsetResponse>, Status> {
        let inner = request.into_inner();
        debug!(
            topic = %inner.topic,
            partition = inner.partition,
            "NextOffset request"
        );

        match self.next_offset_internal(inner).await {
            Ok(offset) => Ok(Response::new(NextOffsetResponse {
                offset: offset.get(),
                error_code: ErrorCode::None.into(),
                error_message: None,
            })),
            Err(e) => {
                warn!(error = %e, "NextOffset failed");
                Ok(Response::new(NextOffsetResponse {
                    offset: 0,
                    error_code: e.to_error_code().into(),
                    error_message: Some(e.message()),
                }))
            }
        }
    }
}
