//! The packet pool and its allocator.
//!
//! ## Concurrency
//!
//! Every operation takes the pool's single lock for its whole duration. All
//! operations are bounded scans over `N` records, so there is exactly one
//! writer at a time and nobody ever waits for a slot: an exhausted pool
//! answers `None` right away and the caller decides whether to retry or drop.
//!
//! ## Handles
//!
//! Records are never copied out of the pool. `acquire` and the selection
//! queries hand out a [`RecordRef`], which names one allocation of one slot
//! of one particular pool. Handles from another pool are rejected as unknown
//! records. Each slot counts its allocations; a handle from an earlier
//! allocation of the slot is stale. Releasing through a stale handle is a
//! double free and leaves the slot alone, every other use is rejected.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, trace, warn};

use crate::admission;
use crate::component::Component;
use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::priority::Priority;
use crate::record::BufferRecord;
use crate::sync::SyncStatus;

/// Number of records in the process-wide pool
pub const DEFAULT_CAPACITY: usize = 10;

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

static GLOBAL_POOL: OnceLock<PacketPool> = OnceLock::new();

/// Handle to one allocation of one record of one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pool: u32,
    slot: u8,
    generation: u32,
}

impl RecordRef {
    /// Storage position of the record
    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    /// Identifier of the issuing pool
    pub fn pool_id(&self) -> u32 {
        self.pool
    }

    /// Allocation count of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool{}/slot{}@{}", self.pool, self.slot, self.generation)
    }
}

/// Record storage guarded by the pool lock
pub(crate) struct Slots<const N: usize> {
    pub(crate) records: [BufferRecord; N],
    generations: [u32; N],
}

/// Fixed-capacity pool of packet buffer records shared by the whole stack.
pub struct PacketPool<const N: usize = DEFAULT_CAPACITY> {
    id: u32,
    config: PoolConfig,
    sync: Arc<dyn SyncStatus>,
    slots: Mutex<Slots<N>>,
}

impl<const N: usize> PacketPool<N> {
    /// Create a pool with every record free
    pub fn new(config: PoolConfig, sync: Arc<dyn SyncStatus>) -> Result<Self> {
        config.validate(N)?;
        let origin = config.payload_origin();
        Ok(Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            config,
            sync,
            slots: Mutex::new(Slots {
                records: std::array::from_fn(|_| BufferRecord::free(origin)),
                generations: [0; N],
            }),
        })
    }

    /// Number of records
    pub fn capacity(&self) -> usize {
        N
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Identifier stamped into every handle this pool issues
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Request a free record at the configured default priority.
    ///
    /// Returns `None` when the node is not synchronized and `creator` ranks
    /// below the MAC engine, when the control-plane quota is reached and
    /// `creator` is a data-plane component, or when every slot is taken.
    pub fn acquire(&self, creator: Component) -> Option<RecordRef> {
        self.acquire_with_priority(creator, self.config.default_priority)
    }

    /// Request a free record with an explicit priority
    pub fn acquire_with_priority(&self, creator: Component, priority: Priority) -> Option<RecordRef> {
        if !creator.can_create() {
            debug!(%creator, "acquire refused: component cannot create records");
            return None;
        }

        let mut slots = self.slots.lock();

        if !creator.is_sync_exempt() && !self.sync.is_synchronized() {
            trace!(%creator, "acquire refused: not synchronized");
            return None;
        }

        if !creator.is_quota_exempt()
            && !admission::has_high_priority_headroom(&slots.records[..], self.config.reserved_quota)
        {
            trace!(%creator, "acquire refused: control-plane quota reached");
            return None;
        }

        match slots.records.iter().position(BufferRecord::is_free) {
            Some(slot) => {
                slots.records[slot].claim(creator, priority);
                slots.generations[slot] = slots.generations[slot].wrapping_add(1);
                let record = self.handle(&slots, slot);
                debug!(%record, %creator, priority = priority.level(), "record acquired");
                Some(record)
            }
            None => {
                trace!(%creator, "acquire refused: pool exhausted");
                None
            }
        }
    }

    /// Return a record to the free state.
    ///
    /// Releasing a free record, or releasing through a handle whose slot has
    /// been allocated again since, is logged as a double free and still
    /// succeeds without touching the slot. Releasing a handle of another pool
    /// fails with [`PoolError::UnknownRecord`] and leaves the pool untouched.
    pub fn release(&self, record: RecordRef) -> Result<()> {
        let slot = self.locate(record).inspect_err(|_| {
            error!(%record, "release failed: record does not belong to this pool");
        })?;
        let mut slots = self.slots.lock();
        if Self::is_stale(&slots, record) {
            warn!(%record, "double free: slot was allocated again since this handle was issued");
            return Ok(());
        }
        self.reset_slot(&mut slots, slot);
        Ok(())
    }

    /// Like [`release`](Self::release), also reporting a caller that is not
    /// the record's creator. The record is freed either way.
    pub fn release_by(&self, record: RecordRef, caller: Component) -> Result<()> {
        let slot = self.locate(record).inspect_err(|_| {
            error!(%record, %caller, "release failed: record does not belong to this pool");
        })?;
        let mut slots = self.slots.lock();
        if Self::is_stale(&slots, record) {
            warn!(%record, %caller, "double free: slot was allocated again since this handle was issued");
            return Ok(());
        }
        let entry = &slots.records[slot];
        let creator = entry.creator();
        if !entry.is_free() && creator != caller {
            warn!(%record, %caller, %creator, "record released by a component other than its creator");
        }
        self.reset_slot(&mut slots, slot);
        Ok(())
    }

    /// Free every allocated record created by `creator`; returns how many were freed
    pub fn release_all_by_creator(&self, creator: Component) -> usize {
        self.reclaim(|record| record.creator() == creator, "creator", creator)
    }

    /// Free every allocated record owned by `owner`; returns how many were freed
    pub fn release_all_by_owner(&self, owner: Component) -> usize {
        self.reclaim(|record| record.owner() == owner, "owner", owner)
    }

    /// Data-plane creators may still allocate
    pub fn has_high_priority_headroom(&self) -> bool {
        let slots = self.slots.lock();
        admission::has_high_priority_headroom(&slots.records[..], self.config.reserved_quota)
    }

    /// Number of allocated records
    pub fn occupancy(&self) -> usize {
        self.slots.lock().records.iter().filter(|record| !record.is_free()).count()
    }

    /// Read a record.
    ///
    /// `f` runs with the pool locked and must not call back into the pool.
    pub fn inspect<R>(&self, record: RecordRef, f: impl FnOnce(&BufferRecord) -> R) -> Result<R> {
        let slot = self.locate(record)?;
        let slots = self.slots.lock();
        Self::check_current(&slots, record)?;
        Ok(f(&slots.records[slot]))
    }

    /// Modify a record on behalf of `caller`.
    ///
    /// Allowed for the current owner, and for the creator while the record is
    /// still unclaimed (owned by [`Component::Pool`]). `f` runs with the pool
    /// locked and must not call back into the pool.
    pub fn modify<R>(
        &self,
        record: RecordRef,
        caller: Component,
        f: impl FnOnce(&mut BufferRecord) -> R,
    ) -> Result<R> {
        let slot = self.locate(record)?;
        let mut slots = self.slots.lock();
        Self::check_current(&slots, record)?;
        Self::check_owner(&slots.records[slot], record, caller)?;
        Ok(f(&mut slots.records[slot]))
    }

    /// Pass ownership of a record from `from` to `to`.
    ///
    /// `from` must be allowed to modify the record. Ownership can never be
    /// handed to `Null` or back to the pool marker: records are freed
    /// through `release` only.
    pub fn hand_off(&self, record: RecordRef, from: Component, to: Component) -> Result<()> {
        let slot = self.locate(record)?;
        if matches!(to, Component::Null | Component::Pool) {
            return Err(PoolError::InvalidHandOff { record, target: to });
        }
        let mut slots = self.slots.lock();
        Self::check_current(&slots, record)?;
        Self::check_owner(&slots.records[slot], record, from)?;
        slots.records[slot].set_owner(to);
        trace!(%record, %from, %to, "ownership handed off");
        Ok(())
    }

    pub(crate) fn lock_slots(&self) -> MutexGuard<'_, Slots<N>> {
        self.slots.lock()
    }

    /// Handle for the current allocation of `slot`
    pub(crate) fn handle(&self, slots: &Slots<N>, slot: usize) -> RecordRef {
        RecordRef {
            pool: self.id,
            slot: slot as u8,
            generation: slots.generations[slot],
        }
    }

    fn locate(&self, record: RecordRef) -> Result<usize> {
        if record.pool == self.id && record.slot() < N {
            Ok(record.slot())
        } else {
            Err(PoolError::UnknownRecord(record))
        }
    }

    fn is_stale(slots: &Slots<N>, record: RecordRef) -> bool {
        slots.generations[record.slot()] != record.generation
    }

    fn check_current(slots: &Slots<N>, record: RecordRef) -> Result<()> {
        if Self::is_stale(slots, record) {
            return Err(PoolError::StaleRecord(record));
        }
        Ok(())
    }

    fn check_owner(entry: &BufferRecord, record: RecordRef, caller: Component) -> Result<()> {
        let owner = entry.owner();
        let unclaimed_by_creator = owner == Component::Pool && entry.creator() == caller;
        if owner.is_null() || (owner != caller && !unclaimed_by_creator) {
            return Err(PoolError::NotOwner {
                record,
                caller,
                owner,
            });
        }
        Ok(())
    }

    fn reset_slot(&self, slots: &mut Slots<N>, slot: usize) {
        let record = self.handle(slots, slot);
        let entry = &mut slots.records[slot];
        if entry.is_free() {
            warn!(%record, "double free: record is already free");
        } else {
            debug!(%record, creator = %entry.creator(), "record released");
        }
        entry.reset(self.config.payload_origin());
    }

    fn reclaim<F>(&self, matches: F, field: &'static str, component: Component) -> usize
    where
        F: Fn(&BufferRecord) -> bool,
    {
        let origin = self.config.payload_origin();
        let mut slots = self.slots.lock();
        let mut freed = 0;
        for record in slots
            .records
            .iter_mut()
            .filter(|record| !record.is_free() && matches(record))
        {
            record.reset(origin);
            freed += 1;
        }
        if freed > 0 {
            debug!(by = field, %component, freed, "records reclaimed");
        }
        freed
    }
}

impl<const N: usize> fmt::Debug for PacketPool<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketPool")
            .field("id", &self.id)
            .field("capacity", &N)
            .field("config", &self.config)
            .field("synchronized", &self.sync.is_synchronized())
            .finish()
    }
}

/// Install the process-wide pool. Fails if one is installed already.
pub fn install_global(config: PoolConfig, sync: Arc<dyn SyncStatus>) -> Result<&'static PacketPool> {
    let pool = PacketPool::new(config, sync)?;
    GLOBAL_POOL
        .set(pool)
        .map_err(|_| PoolError::AlreadyInstalled)?;
    GLOBAL_POOL.get().ok_or(PoolError::AlreadyInstalled)
}

/// The process-wide pool, once installed
pub fn global() -> Option<&'static PacketPool> {
    GLOBAL_POOL.get()
}
