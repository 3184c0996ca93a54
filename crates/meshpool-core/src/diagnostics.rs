//! Pool occupancy snapshots for status reporting.
//!
//! The status link periodically asks for the `(creator, owner)` pair of
//! every record. The pairs are copied inside one critical section; building
//! the owned snapshot happens after the lock is released.

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::pool::PacketPool;

/// Creator and owner of one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStatus {
    /// Component that allocated the record
    pub creator: Component,
    /// Component currently holding the record
    pub owner: Component,
}

impl SlotStatus {
    /// Slot is unused
    pub fn is_free(&self) -> bool {
        self.owner.is_null()
    }
}

/// Occupancy of every record, in storage order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Per-slot status
    pub slots: Vec<SlotStatus>,
}

impl PoolSnapshot {
    /// Number of allocated records
    pub fn occupancy(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_free()).count()
    }

    /// Number of free records
    pub fn free_slots(&self) -> usize {
        self.slots.len() - self.occupancy()
    }

    /// Number of records allocated by `creator`
    pub fn count_created_by(&self, creator: Component) -> usize {
        self.slots
            .iter()
            .filter(|slot| !slot.is_free() && slot.creator == creator)
            .count()
    }

    /// Status frame payload: creator and owner ids, two bytes per slot
    pub fn to_status_bytes(&self) -> Vec<u8> {
        self.slots
            .iter()
            .flat_map(|slot| [slot.creator.as_u8(), slot.owner.as_u8()])
            .collect()
    }
}

/// Consumer of status snapshots, e.g. a serial status link
pub trait StatusSink {
    /// Error raised while emitting
    type Error;

    /// Emit one snapshot
    fn emit(&mut self, snapshot: &PoolSnapshot) -> Result<(), Self::Error>;
}

impl<const N: usize> PacketPool<N> {
    /// Copy every record's creator and owner
    pub fn snapshot(&self) -> PoolSnapshot {
        let slots: [SlotStatus; N] = {
            let guard = self.lock_slots();
            let records = &guard.records;
            std::array::from_fn(|i| SlotStatus {
                creator: records[i].creator(),
                owner: records[i].owner(),
            })
        };
        PoolSnapshot {
            slots: slots.to_vec(),
        }
    }
}

/// Snapshot `pool` into `sink`
pub fn report_status<const N: usize, S: StatusSink>(
    pool: &PacketPool<N>,
    sink: &mut S,
) -> Result<(), S::Error> {
    let snapshot = pool.snapshot();
    tracing::trace!(occupancy = snapshot.occupancy(), "reporting pool status");
    sink.emit(&snapshot)
}
