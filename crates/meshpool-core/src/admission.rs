//! Admission control for data-plane allocations.
//!
//! A quota of slots is held back for control-plane creators (the MAC engine,
//! the reservation sublayer, capacity negotiation). Once data-plane records
//! fill `capacity - reserved_quota` slots, data-plane producers are refused
//! until some of their records are released, while control-plane producers
//! can still claim the remaining slots.

use crate::record::BufferRecord;

/// Number of allocated records created by non-privileged components.
///
/// Free records carry the `Null` creator, which is privileged, so they are
/// never counted.
pub fn data_plane_count(records: &[BufferRecord]) -> usize {
    records
        .iter()
        .filter(|record| !record.creator().is_quota_exempt())
        .count()
}

/// True while data-plane records occupy fewer than `capacity - reserved_quota` slots.
pub fn has_high_priority_headroom(records: &[BufferRecord], reserved_quota: usize) -> bool {
    let budget = records.len().saturating_sub(reserved_quota);
    data_plane_count(records) < budget
}
