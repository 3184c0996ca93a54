//! Configuration for the packet pool.

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};
use crate::priority::Priority;
use crate::record::MAX_FRAME_LEN;

/// Link-layer security mode, which fixes the trailer length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityMode {
    /// No link-layer security
    #[default]
    None,
    /// Authentication only, 4-byte MIC
    Mic32,
    /// Authentication only, 8-byte MIC
    Mic64,
    /// Authentication only, 16-byte MIC
    Mic128,
    /// Encryption with a 4-byte MIC
    EncMic32,
    /// Encryption with an 8-byte MIC
    EncMic64,
    /// Encryption with a 16-byte MIC
    EncMic128,
}

impl SecurityMode {
    /// Length of the authentication tag appended to every frame
    pub fn trailer_len(self) -> usize {
        match self {
            SecurityMode::None => 0,
            SecurityMode::Mic32 | SecurityMode::EncMic32 => 4,
            SecurityMode::Mic64 | SecurityMode::EncMic64 => 8,
            SecurityMode::Mic128 | SecurityMode::EncMic128 => 16,
        }
    }

    /// IEEE 802.15.4 security level
    pub fn level(self) -> u8 {
        match self {
            SecurityMode::None => 0,
            SecurityMode::Mic32 => 1,
            SecurityMode::Mic64 => 2,
            SecurityMode::Mic128 => 3,
            SecurityMode::EncMic32 => 5,
            SecurityMode::EncMic64 => 6,
            SecurityMode::EncMic128 => 7,
        }
    }
}

/// Pool configuration.
///
/// Capacity is not part of it: that is the pool's const parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Slots held back for control-plane creators
    pub reserved_quota: usize,

    /// Priority given by `acquire` when the caller names none
    pub default_priority: Priority,

    /// Link-layer security mode
    pub security: SecurityMode,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            reserved_quota: 5,
            default_priority: Priority::LOWEST,
            security: SecurityMode::None,
        }
    }
}

impl PoolConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the reserved control-plane quota
    pub fn with_reserved_quota(mut self, slots: usize) -> Self {
        self.reserved_quota = slots;
        self
    }

    /// Builder: set the default allocation priority
    pub fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }

    /// Builder: set the security mode
    pub fn with_security(mut self, security: SecurityMode) -> Self {
        self.security = security;
        self
    }

    /// Payload offset of a freshly reset record
    pub fn payload_origin(&self) -> usize {
        MAX_FRAME_LEN - self.security.trailer_len()
    }

    /// Slots open to non-privileged creators in a pool of `capacity`
    pub fn open_slots(&self, capacity: usize) -> usize {
        capacity.saturating_sub(self.reserved_quota)
    }

    /// Check the configuration against a pool capacity
    pub fn validate(&self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(PoolError::InvalidConfig("pool capacity must be at least 1".into()));
        }
        if capacity > u8::MAX as usize {
            return Err(PoolError::InvalidConfig(format!(
                "pool capacity {} exceeds {}",
                capacity,
                u8::MAX
            )));
        }
        if self.reserved_quota > capacity {
            return Err(PoolError::InvalidConfig(format!(
                "reserved quota {} exceeds capacity {}",
                self.reserved_quota, capacity
            )));
        }
        Ok(())
    }
}
