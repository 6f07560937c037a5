//! Strand Core - shared types for the Strand commit log.
//!
//! This crate provides the vocabulary the rest of the workspace speaks:
//! strongly-typed offsets and partition ids, the [`Record`] unit of data,
//! and the limits every component honors.
//!
//! # Design Principles
//!
//! - **Strongly-typed identifiers**: an `Offset` is not a `u64`, and a
//!   `PartitionId` is not an `Offset`
//! - **Explicit limits**: every size and count has a bounded maximum
//! - **No unsafe code**

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod limits;
mod record;
mod types;

pub use record::Record;
pub use types::{Offset, PartitionId};
