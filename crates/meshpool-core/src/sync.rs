//! Network synchronization status.
//!
//! The MAC engine owns synchronization; the pool only asks whether the node
//! is currently synchronized before admitting upper-layer traffic.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Source of the node's synchronization state
pub trait SyncStatus: Send + Sync + Debug {
    /// Node is synchronized to the network
    fn is_synchronized(&self) -> bool;
}

/// Shared synchronization flag, written by the MAC engine
#[derive(Debug, Default)]
pub struct SyncFlag(AtomicBool);

impl SyncFlag {
    /// Create a flag with the given initial state
    pub fn new(synchronized: bool) -> Self {
        SyncFlag(AtomicBool::new(synchronized))
    }

    /// Create a flag that starts synchronized
    pub fn synchronized() -> Self {
        Self::new(true)
    }

    /// Update the state
    pub fn set(&self, synchronized: bool) {
        self.0.store(synchronized, Ordering::Release);
    }
}

impl SyncStatus for SyncFlag {
    fn is_synchronized(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl<T: SyncStatus + ?Sized> SyncStatus for Arc<T> {
    fn is_synchronized(&self) -> bool {
        (**self).is_synchronized()
    }
}
