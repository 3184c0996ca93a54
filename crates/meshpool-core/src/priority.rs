//! Transmit priority and candidate ranking.
//!
//! Selection queries do not walk the pool in storage order. They walk a
//! [`PriorityOrder`]: the indices of every allocated record, most urgent
//! first, with storage order breaking ties. The ranking is a separate index
//! array; records never move, so handles held elsewhere stay valid.

use serde::{Deserialize, Serialize};

use crate::record::BufferRecord;

/// Transmit priority. Lower levels are more urgent.
///
/// Serialized as its level; deserialized levels are clamped like [`Priority::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    /// Most urgent level
    pub const HIGHEST: Priority = Priority(0);

    /// Least urgent level, given to records allocated without a priority
    pub const LOWEST: Priority = Priority(8);

    /// Create a priority, clamping anything past [`Priority::LOWEST`]
    pub fn new(level: u8) -> Self {
        Priority(level.min(Self::LOWEST.0))
    }

    /// Numeric level
    pub fn level(self) -> u8 {
        self.0
    }

    /// Strictly more urgent than `other`
    pub fn is_more_urgent_than(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::LOWEST
    }
}

impl From<u8> for Priority {
    fn from(level: u8) -> Self {
        Priority::new(level)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.level()
    }
}

/// Allocated slots ranked by priority, ties kept in storage order.
#[derive(Debug, Clone)]
pub struct PriorityOrder<const N: usize> {
    slots: [usize; N],
    len: usize,
}

impl<const N: usize> PriorityOrder<N> {
    /// Rank every allocated record of `records`.
    ///
    /// Stable insertion sort over slot indices: a record only moves ahead of
    /// records with a strictly lower urgency.
    pub fn rank(records: &[BufferRecord; N]) -> Self {
        let mut slots = [0usize; N];
        let mut len = 0;

        for (index, record) in records.iter().enumerate() {
            if record.is_free() {
                continue;
            }
            let priority = record.priority();
            let mut pos = len;
            while pos > 0 && records[slots[pos - 1]].priority() > priority {
                slots[pos] = slots[pos - 1];
                pos -= 1;
            }
            slots[pos] = index;
            len += 1;
        }

        Self { slots, len }
    }

    /// Ranked slot indices, most urgent first
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots[..self.len].iter().copied()
    }

    /// First ranked slot whose record satisfies `predicate`
    pub fn first_match<F>(&self, records: &[BufferRecord; N], mut predicate: F) -> Option<usize>
    where
        F: FnMut(&BufferRecord) -> bool,
    {
        self.iter().find(|&slot| predicate(&records[slot]))
    }

    /// Number of ranked (allocated) records
    pub fn len(&self) -> usize {
        self.len
    }

    /// No record is allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::record::MAX_FRAME_LEN;

    fn records_with(priorities: &[Option<u8>; 6]) -> [BufferRecord; 6] {
        std::array::from_fn(|i| {
            let mut record = BufferRecord::free(MAX_FRAME_LEN);
            if let Some(level) = priorities[i] {
                record.claim(Component::Udp, Priority::new(level));
            }
            record
        })
    }

    #[test]
    fn test_priority_clamps() {
        assert_eq!(Priority::new(200), Priority::LOWEST);
        assert_eq!(Priority::from(3).level(), 3);
        assert_eq!(Priority::default(), Priority::LOWEST);
        assert!(Priority::HIGHEST.is_more_urgent_than(Priority::LOWEST));
        assert!(!Priority::new(4).is_more_urgent_than(Priority::new(4)));
    }

    #[test]
    fn test_priority_json_clamps() {
        let priority: Priority = serde_json::from_str("200").unwrap();
        assert_eq!(priority, Priority::LOWEST);
        let priority: Priority = serde_json::from_str("3").unwrap();
        assert_eq!(priority.level(), 3);
        assert_eq!(serde_json::to_string(&Priority::new(5)).unwrap(), "5");
    }

    #[test]
    fn test_rank_skips_free_and_sorts() {
        let records = records_with(&[Some(5), None, Some(1), Some(8), None, Some(3)]);
        let order = PriorityOrder::rank(&records);
        assert_eq!(order.iter().collect::<Vec<_>>(), vec![2, 5, 0, 3]);
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let records = records_with(&[Some(4), Some(2), Some(4), Some(2), Some(4), None]);
        let order = PriorityOrder::rank(&records);
        assert_eq!(order.iter().collect::<Vec<_>>(), vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_rank_leaves_records_in_place() {
        let records = records_with(&[Some(7), Some(0), None, None, None, None]);
        let before = records.clone();
        let _ = PriorityOrder::rank(&records);
        assert_eq!(records, before);
    }

    #[test]
    fn test_empty_pool() {
        let records = records_with(&[None; 6]);
        let order = PriorityOrder::rank(&records);
        assert!(order.is_empty());
        assert_eq!(order.first_match(&records, |_| true), None);
    }
}
