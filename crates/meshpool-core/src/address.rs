//! Link and network addresses carried in record metadata.
//!
//! The pool never parses frames; it only needs two predicates over the
//! next/previous-hop address when matching transmit candidates:
//! [`Address::same_as`] and [`Address::is_broadcast_multicast`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed address, as stored in a record's metadata
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Address {
    /// No address set
    #[default]
    None,
    /// 16-bit short address
    Short([u8; 2]),
    /// 64-bit extended (EUI-64) address
    Long([u8; 8]),
    /// 128-bit IPv6 address
    Ipv6([u8; 16]),
    /// Wildcard neighbor: any neighbor the current slot may serve
    Anycast,
}

impl Address {
    /// Short broadcast address
    pub const BROADCAST_SHORT: Address = Address::Short([0xFF, 0xFF]);

    /// Extended broadcast address
    pub const BROADCAST_LONG: Address = Address::Long([0xFF; 8]);

    /// Build an extended address from its integer form
    pub fn long_from_u64(value: u64) -> Self {
        Address::Long(value.to_be_bytes())
    }

    /// Check if no address is set
    pub fn is_none(&self) -> bool {
        matches!(self, Address::None)
    }

    /// Check if this is the anycast wildcard
    pub fn is_anycast(&self) -> bool {
        matches!(self, Address::Anycast)
    }

    /// A real address that frames can be sent to
    pub fn is_concrete(&self) -> bool {
        matches!(self, Address::Short(_) | Address::Long(_) | Address::Ipv6(_))
    }

    /// Same type and same bytes. Never true for `None` or `Anycast`.
    pub fn same_as(&self, other: &Address) -> bool {
        self.is_concrete() && self == other
    }

    /// Check for the link broadcast address or an IPv6 multicast group
    pub fn is_broadcast_multicast(&self) -> bool {
        match self {
            Address::Short(bytes) => bytes.iter().all(|b| *b == 0xFF),
            Address::Long(bytes) => bytes.iter().all(|b| *b == 0xFF),
            Address::Ipv6(bytes) => bytes[0] == 0xFF,
            Address::None | Address::Anycast => false,
        }
    }

    /// Raw address bytes, empty for `None` and `Anycast`
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Address::Short(bytes) => bytes,
            Address::Long(bytes) => bytes,
            Address::Ipv6(bytes) => bytes,
            Address::None | Address::Anycast => &[],
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::None => write!(f, "Address::None"),
            Address::Anycast => write!(f, "Address::Anycast"),
            _ => write!(f, "Address({})", self),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::None => f.write_str("none"),
            Address::Anycast => f.write_str("anycast"),
            _ => {
                for (i, byte) in self.as_bytes().iter().enumerate() {
                    if i > 0 {
                        f.write_str(":")?;
                    }
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}
