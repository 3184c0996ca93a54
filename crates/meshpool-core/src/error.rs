//! Error types for the packet pool.

use thiserror::Error;

use crate::component::Component;
use crate::pool::RecordRef;

/// Packet pool error type
///
/// Allocation refusals are not errors: `acquire` simply yields `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The handle was not issued by this pool
    #[error("record {0} does not belong to this pool")]
    UnknownRecord(RecordRef),

    /// The handle's slot has been released and allocated again since it was issued
    #[error("record {0} is stale: its slot has been reallocated")]
    StaleRecord(RecordRef),

    /// The caller is neither the owner nor the creator of an unclaimed record
    #[error("{caller} may not modify record {record}: owned by {owner}")]
    NotOwner {
        /// Record the caller tried to touch
        record: RecordRef,
        /// Component that made the call
        caller: Component,
        /// Current owner of the record
        owner: Component,
    },

    /// Ownership cannot be handed to this component
    #[error("cannot hand record {record} off to {target}")]
    InvalidHandOff {
        /// Record being handed off
        record: RecordRef,
        /// Rejected target owner
        target: Component,
    },

    /// Not enough headroom in front of the payload
    #[error("cannot reserve {requested} header bytes: only {available} bytes of headroom")]
    HeaderOverflow {
        /// Bytes requested
        requested: usize,
        /// Bytes available in front of the payload
        available: usize,
    },

    /// Tried to strip more bytes than the payload holds
    #[error("cannot toss {requested} header bytes: payload holds only {length}")]
    HeaderUnderflow {
        /// Bytes requested
        requested: usize,
        /// Current payload length
        length: usize,
    },

    /// Configuration error
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// A process-wide pool was installed already
    #[error("a process-wide packet pool is already installed")]
    AlreadyInstalled,
}

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;
