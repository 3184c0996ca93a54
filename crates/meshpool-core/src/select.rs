//! Transmit-candidate selection for the MAC engine.
//!
//! ## Queries
//!
//! | Query | Owner role | Creator | Address |
//! |-------|------------|---------|---------|
//! | `next_handoff_to_link_layer` | `FromMac` | not `Tsch` | - |
//! | `next_handoff_from_link_layer` | `FromMac` | `Tsch` | - |
//! | `next_control_frame` | `ToMac` | `Negotiation` | hop = neighbor, or anycast |
//! | `next_data_frame` | `ToMac` | control frame first, then any | see below |
//! | `next_beacon_frame` | `ToMac` | `Reservation` | broadcast/multicast hop |
//!
//! For an anycast slot, `next_data_frame` takes any queued frame except the
//! reservation sublayer's broadcasts, so its unicast keep-alives still go out
//! while beacons stay in beacon slots.
//!
//! The transmit queries walk the pool in [`PriorityOrder`]; hand-off queries
//! walk it in storage order. Every query is read-only: the returned record
//! stays allocated and unchanged.

use crate::address::Address;
use crate::component::Component;
use crate::pool::{PacketPool, RecordRef};
use crate::priority::PriorityOrder;
use crate::record::BufferRecord;

impl<const N: usize> PacketPool<N> {
    /// Frame the MAC engine finished with and handed back to the link layer
    pub fn next_handoff_to_link_layer(&self) -> Option<RecordRef> {
        let slots = self.lock_slots();
        let records = &slots.records;
        records
            .iter()
            .position(|r| r.owner() == Component::FromMac && r.creator() != Component::Tsch)
            .map(|slot| self.handle(&slots, slot))
    }

    /// Frame received by the MAC engine, waiting for the link layer
    pub fn next_handoff_from_link_layer(&self) -> Option<RecordRef> {
        let slots = self.lock_slots();
        let records = &slots.records;
        records
            .iter()
            .position(|r| r.owner() == Component::FromMac && r.creator() == Component::Tsch)
            .map(|slot| self.handle(&slots, slot))
    }

    /// Queued capacity-negotiation frame for `neighbor`
    pub fn next_control_frame(&self, neighbor: &Address) -> Option<RecordRef> {
        let slots = self.lock_slots();
        let records = &slots.records;
        let order = PriorityOrder::rank(records);
        control_frame(records, &order, neighbor).map(|slot| self.handle(&slots, slot))
    }

    /// Frame to transmit in a slot towards `neighbor`.
    ///
    /// A negotiation frame for the neighbor pre-empts everything else.
    /// Otherwise a concrete neighbor gets the most urgent frame whose next
    /// hop is that neighbor, and [`Address::Anycast`] gets the most urgent
    /// frame that is not a reservation-sublayer broadcast.
    pub fn next_data_frame(&self, neighbor: &Address) -> Option<RecordRef> {
        let slots = self.lock_slots();
        let records = &slots.records;
        let order = PriorityOrder::rank(records);

        if let Some(slot) = control_frame(records, &order, neighbor) {
            return Some(self.handle(&slots, slot));
        }

        let slot = if neighbor.is_anycast() {
            order.first_match(records, |r| {
                is_queued(r)
                    && (r.creator() != Component::Reservation
                        || !r.l2.next_or_previous_hop.is_broadcast_multicast())
            })
        } else if neighbor.is_concrete() {
            order.first_match(records, |r| {
                is_queued(r) && neighbor.same_as(&r.l2.next_or_previous_hop)
            })
        } else {
            None
        };
        slot.map(|slot| self.handle(&slots, slot))
    }

    /// Queued beacon: a reservation-sublayer broadcast
    pub fn next_beacon_frame(&self) -> Option<RecordRef> {
        let slots = self.lock_slots();
        let records = &slots.records;
        let order = PriorityOrder::rank(records);
        order
            .first_match(records, |r| {
                is_queued(r)
                    && r.creator() == Component::Reservation
                    && r.l2.next_or_previous_hop.is_broadcast_multicast()
            })
            .map(|slot| self.handle(&slots, slot))
    }
}

fn is_queued(record: &BufferRecord) -> bool {
    record.owner() == Component::ToMac
}

fn control_frame<const N: usize>(
    records: &[BufferRecord; N],
    order: &PriorityOrder<N>,
    neighbor: &Address,
) -> Option<usize> {
    order.first_match(records, |r| {
        is_queued(r)
            && r.creator() == Component::Negotiation
            && (neighbor.is_anycast() || neighbor.same_as(&r.l2.next_or_previous_hop))
    })
}
