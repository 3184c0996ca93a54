//! # meshpool core
//!
//! Packet buffer pool and transmit-candidate selection for a low-power
//! time-slotted mesh node.
//!
//! ## Overview
//!
//! Every layer of the stack (application, routing, link, MAC) builds and
//! receives frames in one fixed set of packet buffers. This crate owns that
//! set:
//!
//! - **Allocator**: first-fit `acquire` / `release` with creator and owner stamps
//! - **Admission**: synchronization gate and a quota of slots held back for
//!   control-plane traffic
//! - **Bulk reclaim**: free everything one component created or holds
//! - **Selection**: read-only queries the MAC engine uses to pick the next
//!   frame for a slot, ranked by priority
//! - **Diagnostics**: occupancy snapshots for the status link
//!
//! ## Record Flow
//!
//! ```text
//! producer ── acquire ──▶ [owner = Pool] ── hand_off ──▶ [owner = ToMac]
//!                                                          │
//!              MAC slot ◀── next_data_frame / next_beacon_frame
//!                 │
//!                 └── hand_off ──▶ [owner = FromMac] ── next_handoff_to_link_layer
//!                                                          │
//!                                        creator ◀── release
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use meshpool_core::{Address, Component, PacketPool, PoolConfig, SyncFlag};
//!
//! let sync = Arc::new(SyncFlag::synchronized());
//! let pool: PacketPool = PacketPool::new(PoolConfig::default(), sync).unwrap();
//!
//! let neighbor = Address::long_from_u64(0x0012_4b00_0001_0203);
//! let frame = pool.acquire(Component::Udp).unwrap();
//! pool.modify(frame, Component::Udp, |record| {
//!     record.l2.next_or_previous_hop = neighbor;
//!     record.push_header(b"hello")
//! })
//! .unwrap()
//! .unwrap();
//! pool.hand_off(frame, Component::Udp, Component::ToMac).unwrap();
//!
//! assert_eq!(pool.next_data_frame(&neighbor), Some(frame));
//! pool.release(frame).unwrap();
//! assert_eq!(pool.next_data_frame(&neighbor), None);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod address;
pub mod admission;
pub mod component;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pool;
pub mod priority;
pub mod record;
mod select;
pub mod sync;

// Re-export main types
pub use address::Address;
pub use component::Component;
pub use config::{PoolConfig, SecurityMode};
pub use diagnostics::{report_status, PoolSnapshot, SlotStatus, StatusSink};
pub use error::{PoolError, Result};
pub use pool::{global, install_global, PacketPool, RecordRef, DEFAULT_CAPACITY};
pub use priority::{Priority, PriorityOrder};
pub use record::{BufferRecord, FrameType, LinkInfo, NetworkInfo, TransportInfo, MAX_FRAME_LEN};
pub use sync::{SyncFlag, SyncStatus};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::address::Address;
    pub use crate::component::Component;
    pub use crate::config::PoolConfig;
    pub use crate::pool::{PacketPool, RecordRef};
    pub use crate::priority::Priority;
    pub use crate::sync::{SyncFlag, SyncStatus};
}
