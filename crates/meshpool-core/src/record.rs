//! Packet buffer records.
//!
//! ## Record Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                     packet: [u8; PACKET_BUFFER_LEN]                    │
//! ├───────────────────────────┬──────────────────────┬───────────────────┤
//! │  headroom                 │  payload (length B)  │  trailer room     │
//! │  (headers prepended here) │                      │  (MIC, FCS)       │
//! └───────────────────────────┴──────────────────────┴───────────────────┘
//!                             ▲
//!                   payload offset, reset to MAX_FRAME_LEN - trailer_len
//! ```
//!
//! Lower layers grow the frame toward the head with
//! [`BufferRecord::reserve_header`], so no layer ever copies the payload.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::component::Component;
use crate::error::{PoolError, Result};
use crate::priority::Priority;

/// Largest IEEE 802.15.4 frame, in bytes
pub const MAX_FRAME_LEN: usize = 127;

/// Bytes of storage per record: length byte, frame, and two radio status bytes
pub const PACKET_BUFFER_LEN: usize = 1 + MAX_FRAME_LEN + 2;

/// IEEE 802.15.4 frame type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum FrameType {
    /// Beacon frame
    Beacon = 0,
    /// Data frame
    Data = 1,
    /// Acknowledgment frame
    Ack = 2,
    /// MAC command frame
    Command = 3,
    /// Not yet decided
    #[default]
    Undefined = 0xFF,
}

/// Transport-layer tags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportInfo {
    /// IANA protocol number, `None` when undefined
    pub protocol: Option<u8>,
    /// Transport header is compressed
    pub protocol_compressed: bool,
}

/// Network-layer addressing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Final destination
    pub destination: Address,
    /// Original source
    pub source: Address,
}

/// Link-layer metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkInfo {
    /// Next hop when sending, previous hop when receiving
    pub next_or_previous_hop: Address,
    /// Frame type
    pub frame_type: FrameType,
    /// Transmission attempts left
    pub retries_left: u8,
    /// Header IE list present
    pub ie_list_present: bool,
    /// Frame is a negative acknowledgment
    pub is_negative_ack: bool,
    /// Payload IE present
    pub payload_ie_present: bool,
    /// Security level, 0 when unsecured
    pub security_level: u8,
}

impl Default for LinkInfo {
    fn default() -> Self {
        Self {
            next_or_previous_hop: Address::None,
            frame_type: FrameType::Undefined,
            retries_left: 0,
            ie_list_present: false,
            is_negative_ack: false,
            payload_ie_present: false,
            security_level: 0,
        }
    }
}

/// One packet buffer slot plus its metadata.
///
/// `creator`, `owner` and `priority` are managed by the pool and only
/// readable from outside; the payload window and the per-layer metadata are
/// for the current owner to fill in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferRecord {
    creator: Component,
    owner: Component,
    priority: Priority,
    packet: [u8; PACKET_BUFFER_LEN],
    payload: usize,
    length: usize,
    /// Transport-layer tags
    pub l4: TransportInfo,
    /// Network-layer addressing
    pub l3: NetworkInfo,
    /// Link-layer metadata
    pub l2: LinkInfo,
}

impl BufferRecord {
    /// A free record whose payload window starts at `payload_origin`
    pub fn free(payload_origin: usize) -> Self {
        Self {
            creator: Component::Null,
            owner: Component::Null,
            priority: Priority::LOWEST,
            packet: [0; PACKET_BUFFER_LEN],
            payload: payload_origin.min(PACKET_BUFFER_LEN),
            length: 0,
            l4: TransportInfo::default(),
            l3: NetworkInfo::default(),
            l2: LinkInfo::default(),
        }
    }

    /// Component that allocated this record
    pub fn creator(&self) -> Component {
        self.creator
    }

    /// Component currently allowed to modify this record
    pub fn owner(&self) -> Component {
        self.owner
    }

    /// Transmit priority
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Slot is unused
    pub fn is_free(&self) -> bool {
        self.owner.is_null()
    }

    /// Offset of the first payload byte
    pub fn payload_offset(&self) -> usize {
        self.payload
    }

    /// Number of valid payload bytes
    pub fn len(&self) -> usize {
        self.length
    }

    /// No payload bytes yet
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Bytes available in front of the payload
    pub fn headroom(&self) -> usize {
        self.payload
    }

    /// Bytes available behind the payload
    pub fn tailroom(&self) -> usize {
        PACKET_BUFFER_LEN - self.payload - self.length
    }

    /// Valid payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.packet[self.payload..self.payload + self.length]
    }

    /// Valid payload bytes, mutable
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.packet[self.payload..self.payload + self.length]
    }

    /// Grow the payload window by `size` bytes toward the head and return the
    /// new header bytes for the caller to fill.
    pub fn reserve_header(&mut self, size: usize) -> Result<&mut [u8]> {
        if size > self.payload {
            return Err(PoolError::HeaderOverflow {
                requested: size,
                available: self.payload,
            });
        }
        self.payload -= size;
        self.length += size;
        Ok(&mut self.packet[self.payload..self.payload + size])
    }

    /// Drop `size` bytes from the head of the payload window
    pub fn toss_header(&mut self, size: usize) -> Result<()> {
        if size > self.length {
            return Err(PoolError::HeaderUnderflow {
                requested: size,
                length: self.length,
            });
        }
        self.payload += size;
        self.length -= size;
        Ok(())
    }

    /// Prepend `header` in front of the current payload
    pub fn push_header(&mut self, header: &[u8]) -> Result<()> {
        self.reserve_header(header.len())?.copy_from_slice(header);
        Ok(())
    }

    pub(crate) fn claim(&mut self, creator: Component, priority: Priority) {
        self.creator = creator;
        self.owner = Component::Pool;
        self.priority = priority;
    }

    pub(crate) fn set_owner(&mut self, owner: Component) {
        self.owner = owner;
    }

    pub(crate) fn reset(&mut self, payload_origin: usize) {
        *self = Self::free(payload_origin);
    }
}
