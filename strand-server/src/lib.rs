//! Strand broker server.
//!
//! This crate is the transport edge of Strand: it exposes the registry's
//! operations over gRPC and hosts the streaming consume loop. The
//! storage engine underneath is synchronous; every call into it goes
//! through `spawn_blocking` so the async runtime never blocks on disk.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod grpc;
mod service;

pub mod proto {
    //! Generated protobuf types.
    #![allow(clippy::pedantic, clippy::nursery)]
    tonic::include_proto!("strand.v1");
}

pub use error::{ServerError, ServerResult};
pub use service::BrokerService;
