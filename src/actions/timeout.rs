//! Pending interaction timeouts, ordered by fire time

use std::collections::{BTreeMap, HashMap};

use ordered_float::OrderedFloat;

/// A scheduled callback into one interaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutEntry {
    pub fire_time: f64,
    pub binding: usize,
    pub control: usize,
    pub interaction: usize,
}

/// At most one pending timeout per interaction
///
/// Entries with equal fire times fire in insertion order.
#[derive(Debug, Default, Clone)]
pub struct TimeoutQueue {
    queue: BTreeMap<(OrderedFloat<f64>, u64), TimeoutEntry>,
    by_interaction: HashMap<usize, (OrderedFloat<f64>, u64)>,
    next_seq: u64,
}

impl TimeoutQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `entry`, replacing any pending timeout of the same interaction
    pub fn insert(&mut self, entry: TimeoutEntry) {
        self.remove(entry.interaction);
        let key = (OrderedFloat(entry.fire_time), self.next_seq);
        self.next_seq += 1;
        self.queue.insert(key, entry);
        self.by_interaction.insert(entry.interaction, key);
    }

    /// Drops the pending timeout of an interaction, if any
    pub fn remove(&mut self, interaction: usize) -> Option<TimeoutEntry> {
        let key = self.by_interaction.remove(&interaction)?;
        self.queue.remove(&key)
    }

    pub fn contains(&self, interaction: usize) -> bool {
        self.by_interaction.contains_key(&interaction)
    }

    /// Removes and returns every entry with `fire_time <= now`, earliest first
    pub fn take_due(&mut self, now: f64) -> Vec<TimeoutEntry> {
        let mut due = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0.0 > now {
                break;
            }
            let entry = entry.remove();
            self.by_interaction.remove(&entry.interaction);
            due.push(entry);
        }
        due
    }

    pub fn next_fire_time(&self) -> Option<f64> {
        self.queue.keys().next().map(|(time, _)| time.0)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.by_interaction.clear();
    }

    /// Drops every timeout whose interaction index lies in `range`
    pub fn remove_range(&mut self, range: std::ops::Range<usize>) {
        let doomed: Vec<usize> = self
            .by_interaction
            .keys()
            .copied()
            .filter(|i| range.contains(i))
            .collect();
        for interaction in doomed {
            self.remove(interaction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fire_time: f64, interaction: usize) -> TimeoutEntry {
        TimeoutEntry {
            fire_time,
            binding: 0,
            control: 0,
            interaction,
        }
    }

    #[test]
    fn test_take_due_in_time_order() {
        let mut queue = TimeoutQueue::new();
        queue.insert(entry(0.5, 1));
        queue.insert(entry(0.2, 2));
        queue.insert(entry(0.9, 3));

        let due = queue.take_due(0.5);
        assert_eq!(
            due.iter().map(|e| e.interaction).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_fire_time(), Some(0.9));
    }

    #[test]
    fn test_insert_replaces_pending() {
        let mut queue = TimeoutQueue::new();
        queue.insert(entry(0.5, 1));
        queue.insert(entry(1.5, 1));
        assert_eq!(queue.len(), 1);
        assert!(queue.take_due(1.0).is_empty());
        assert_eq!(queue.take_due(1.5).len(), 1);
        assert!(!queue.contains(1));
    }

    #[test]
    fn test_remove_range() {
        let mut queue = TimeoutQueue::new();
        for i in 0..5 {
            queue.insert(entry(1.0, i));
        }
        queue.remove_range(1..3);
        assert_eq!(queue.len(), 3);
        assert!(queue.remove(1).is_none());
        assert!(queue.remove(4).is_some());
    }
}
