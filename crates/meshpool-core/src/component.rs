//! Stack component identifiers.
//!
//! Every layer of the node's stack is named by a [`Component`]. The pool uses
//! these identifiers twice: as the `creator` and `owner` stamps on each
//! record, and as an allocation privilege ladder. Lower values are more
//! privileged:
//!
//! ```text
//!  Null ─ Node ─ IdManager ─ Pool ─ Serial ─ Radio ─ Tsch      ← exempt from the sync gate
//!  ToMac ─ FromMac ─ Reservation ─ Neighbors ─ Schedule ─ Negotiation ← exempt from the quota
//!  Bridge ─ Iphc ─ Fragment ─ Forwarding ─ Icmpv6 ─ Rpl ─ Udp ─ Coap ─ App
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a component of the protocol stack.
///
/// The derived ordering follows the discriminants, so `a < b` means `a` is
/// more privileged than `b`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum Component {
    /// Nobody; an owner of `Null` marks a free record
    #[default]
    Null = 0x00,
    /// Boot and task scheduler
    Node = 0x01,
    /// Node identity management
    IdManager = 0x02,
    /// The pool itself: allocated but not yet claimed by any stage
    Pool = 0x03,
    /// Serial / diagnostics link
    Serial = 0x04,
    /// Radio driver
    Radio = 0x05,
    /// Time-slotted MAC engine, owner of network synchronization
    Tsch = 0x06,
    /// Role: queued by the link layer, ready for the MAC to transmit
    ToMac = 0x07,
    /// Role: handed from the MAC back to the link layer
    FromMac = 0x08,
    /// Link-layer reservation sublayer (beacons, keep-alives)
    Reservation = 0x09,
    /// Neighbor table
    Neighbors = 0x0a,
    /// Slot schedule
    Schedule = 0x0b,
    /// Capacity negotiation between neighbors
    Negotiation = 0x0c,
    /// Border-router bridge
    Bridge = 0x0d,
    /// IPv6 header compression
    Iphc = 0x0e,
    /// 6LoWPAN fragmentation
    Fragment = 0x0f,
    /// IPv6 forwarding
    Forwarding = 0x10,
    /// ICMPv6
    Icmpv6 = 0x11,
    /// Routing protocol
    Rpl = 0x12,
    /// UDP transport
    Udp = 0x13,
    /// CoAP
    Coap = 0x14,
    /// Application
    App = 0x15,
}

impl Component {
    /// Least privileged component still allowed to allocate while unsynchronized.
    pub const SYNC_EXEMPT_MAX: Component = Component::Tsch;

    /// Least privileged component exempt from the high-priority quota.
    pub const QUOTA_EXEMPT_MAX: Component = Component::Negotiation;

    /// Every component, in privilege order.
    pub const ALL: [Component; 22] = [
        Component::Null,
        Component::Node,
        Component::IdManager,
        Component::Pool,
        Component::Serial,
        Component::Radio,
        Component::Tsch,
        Component::ToMac,
        Component::FromMac,
        Component::Reservation,
        Component::Neighbors,
        Component::Schedule,
        Component::Negotiation,
        Component::Bridge,
        Component::Iphc,
        Component::Fragment,
        Component::Forwarding,
        Component::Icmpv6,
        Component::Rpl,
        Component::Udp,
        Component::Coap,
        Component::App,
    ];

    /// Raw identifier as carried in status frames
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Look up a component by its raw identifier
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// True for the free-slot sentinel
    pub fn is_null(self) -> bool {
        self == Component::Null
    }

    /// May allocate while the node is not synchronized
    pub fn is_sync_exempt(self) -> bool {
        self <= Self::SYNC_EXEMPT_MAX
    }

    /// Control-plane component, exempt from the high-priority quota
    pub fn is_quota_exempt(self) -> bool {
        self <= Self::QUOTA_EXEMPT_MAX
    }

    /// May appear as the creator of a record.
    ///
    /// `Null` and `Pool` are markers, not producers.
    pub fn can_create(self) -> bool {
        !matches!(self, Component::Null | Component::Pool)
    }

    /// Short lower-case name
    pub fn name(self) -> &'static str {
        match self {
            Component::Null => "null",
            Component::Node => "node",
            Component::IdManager => "id-manager",
            Component::Pool => "pool",
            Component::Serial => "serial",
            Component::Radio => "radio",
            Component::Tsch => "tsch",
            Component::ToMac => "to-mac",
            Component::FromMac => "from-mac",
            Component::Reservation => "reservation",
            Component::Neighbors => "neighbors",
            Component::Schedule => "schedule",
            Component::Negotiation => "negotiation",
            Component::Bridge => "bridge",
            Component::Iphc => "iphc",
            Component::Fragment => "fragment",
            Component::Forwarding => "forwarding",
            Component::Icmpv6 => "icmpv6",
            Component::Rpl => "rpl",
            Component::Udp => "udp",
            Component::Coap => "coap",
            Component::App => "app",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl TryFrom<u8> for Component {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_ordering() {
        assert!(Component::Tsch < Component::Negotiation);
        assert!(Component::Negotiation < Component::Udp);
        assert!(Component::Null < Component::Pool);
    }

    #[test]
    fn test_sync_and_quota_split() {
        assert!(Component::Radio.is_sync_exempt());
        assert!(Component::Tsch.is_sync_exempt());
        assert!(!Component::Reservation.is_sync_exempt());

        assert!(Component::Reservation.is_quota_exempt());
        assert!(Component::Negotiation.is_quota_exempt());
        assert!(!Component::Bridge.is_quota_exempt());
        assert!(!Component::App.is_quota_exempt());
    }

    #[test]
    fn test_raw_ids_match_table() {
        for (index, component) in Component::ALL.iter().enumerate() {
            assert_eq!(component.as_u8() as usize, index);
            assert_eq!(Component::from_u8(index as u8), Some(*component));
        }
        assert_eq!(Component::from_u8(0x16), None);
        assert_eq!(Component::try_from(0x13), Ok(Component::Udp));
        assert_eq!(Component::try_from(0xee), Err(0xee));
    }

    #[test]
    fn test_markers_cannot_create() {
        assert!(!Component::Null.can_create());
        assert!(!Component::Pool.can_create());
        assert!(Component::Tsch.can_create());
        assert!(Component::App.can_create());
    }

    #[test]
    fn test_display() {
        assert_eq!(Component::Negotiation.to_string(), "negotiation");
        assert_eq!(Component::ToMac.to_string(), "to-mac");
    }
}
