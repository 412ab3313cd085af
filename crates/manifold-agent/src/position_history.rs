//! Geometrically sampled history of agent positions
//!
//! A fixed buffer where recent positions dominate the front and older
//! positions survive ever longer toward the back. Each slot has a rollover
//! counter; an insert only shifts the prefix up to the first slot whose
//! counter has not rolled over, so the expected stride between retained
//! positions grows geometrically with slot index.

use manifold_common::Vec3;
use rand::Rng;

/// Number of retained positions
pub const HISTORY_LENGTH: usize = 256;

/// Default counter rollover base
pub const DEFAULT_RADIX: u32 = 20;

/// Default carry threshold: counters below it stop the shift walk
pub const DEFAULT_CARRY_THRESHOLD: u32 = 1;

/// Fixed-length position buffer with geometric retention
#[derive(Debug, Clone)]
pub struct PositionHistory {
    entries: Vec<Vec3>,
    counters: Vec<u32>,
    radix: u32,
    carry_threshold: u32,
}

impl Default for PositionHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionHistory {
    /// Creates a history with the default length and sampling parameters
    pub fn new() -> Self {
        Self::with_params(HISTORY_LENGTH, DEFAULT_RADIX, DEFAULT_CARRY_THRESHOLD)
    }

    /// Creates a history with explicit length, radix, and carry threshold
    pub fn with_params(length: usize, radix: u32, carry_threshold: u32) -> Self {
        let length = length.max(1);
        Self {
            entries: vec![Vec3::ZERO; length],
            counters: vec![0; length],
            radix: radix.max(1),
            carry_threshold,
        }
    }

    /// Number of slots in the buffer
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The buffer always holds positions once reset
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The most recently pushed position
    pub fn latest(&self) -> Vec3 {
        self.entries[0]
    }

    /// Fills the buffer with `position` and randomises the rollover
    /// counters so clustered agents do not shift in lockstep
    pub fn reset(&mut self, position: Vec3) {
        let mut rng = rand::thread_rng();
        for counter in &mut self.counters {
            *counter = rng.gen_range(0..self.radix);
        }
        self.entries.fill(position);
    }

    /// Inserts a position at the front.
    ///
    /// Walks the counters from the front, incrementing each modulo the
    /// radix, and stops at the first slot whose previous value was below
    /// the carry threshold (or at the last slot). The prefix up to that
    /// slot shifts one place toward the back; everything beyond survives
    /// unchanged.
    pub fn push(&mut self, position: Vec3) {
        let last = self.entries.len() - 1;
        let mut shift_count = last;
        for slot in 0..=last {
            let was = self.counters[slot];
            self.counters[slot] = (was + 1) % self.radix;
            if was < self.carry_threshold || slot == last {
                shift_count = slot;
                break;
            }
        }

        for index in (0..shift_count).rev() {
            self.entries[index + 1] = self.entries[index];
        }
        self.entries[0] = position;
    }

    /// Iterates the retained positions from oldest to newest
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.entries.iter().rev().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32) -> Vec3 {
        Vec3::new(x, 0.0, 0.0)
    }

    #[test]
    fn test_latest_is_front() {
        let mut history = PositionHistory::with_params(8, 1, 0);
        history.push(p(1.0));
        history.push(p(2.0));
        assert_eq!(history.latest(), p(2.0));
    }

    #[test]
    fn test_full_shift_behaves_as_fifo() {
        // Threshold 0 never stops the walk: every push shifts the whole
        // buffer.
        let mut history = PositionHistory::with_params(4, 1, 0);
        for x in 1..=6 {
            history.push(p(x as f32));
        }
        let entries: Vec<Vec3> = history.iter_oldest_first().collect();
        assert_eq!(entries, vec![p(3.0), p(4.0), p(5.0), p(6.0)]);
    }

    #[test]
    fn test_threshold_above_radix_only_replaces_front() {
        // Every counter value is below the threshold, so the walk always
        // stops at slot 0 and the back of the buffer never changes.
        let mut history = PositionHistory::with_params(4, 10, 10);
        history.reset(p(0.0));
        history.push(p(1.0));
        history.push(p(2.0));
        history.push(p(3.0));

        let entries: Vec<Vec3> = history.iter_oldest_first().collect();
        assert_eq!(entries, vec![p(0.0), p(0.0), p(0.0), p(3.0)]);
    }

    #[test]
    fn test_geometric_retention() {
        // Radix 2, threshold 1, zeroed counters: shifts reach slot k only
        // every 2^k pushes, so old entries thin out geometrically.
        let mut history = PositionHistory::with_params(4, 2, 1);
        for x in 1..=8 {
            history.push(p(x as f32));
        }

        // Push 1: counters [0...] -> stop at 0.          front [1]
        // Push 2: slot0 was 1 -> carry; slot1 was 0 stop. [2,1]
        // Push 3: stop at 0.                              [3,1]
        // Push 4: carries through slots 0 and 1.          [4,3,1]
        // ...
        let entries: Vec<Vec3> = history.iter_oldest_first().collect();
        assert_eq!(entries[3], p(8.0));
        assert_eq!(entries[2], p(7.0));
        assert_eq!(entries[1], p(5.0));
        assert_eq!(entries[0], p(1.0));
    }

    #[test]
    fn test_reset_fills_buffer() {
        let mut history = PositionHistory::with_params(16, 20, 1);
        history.reset(p(7.0));
        assert!(history.iter_oldest_first().all(|v| v == p(7.0)));
        assert_eq!(history.len(), 16);
    }
}
