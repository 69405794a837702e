//! Bounded in-memory history of recent market snapshots.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use surge_types::MarketStatus;

/// Ring of the most recent [`MarketStatus`] values, oldest evicted first.
#[derive(Debug)]
pub struct MarketHistory {
    capacity: usize,
    entries: Mutex<VecDeque<MarketStatus>>,
}

impl MarketHistory {
    /// A history retaining up to `capacity` entries (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a status, evicting the oldest entry when full.
    pub fn record(&self, status: MarketStatus) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(status);
    }

    /// Up to `limit` most recent entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<MarketStatus> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained entries.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use surge_types::Weather;

    use super::*;

    fn status(sequence: u64) -> MarketStatus {
        MarketStatus {
            demand: 1.0,
            supply: 1.0,
            weather: Weather::Clear,
            weather_multiplier: 1.0,
            traffic_factor: 1.0,
            surge_multiplier: 1.2,
            demand_supply_ratio: 1.0,
            timestamp: Utc::now(),
            sequence,
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let history = MarketHistory::new(3);
        for seq in 1..=5 {
            history.record(status(seq));
        }
        let sequences: Vec<u64> = history.recent(10).iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn recent_returns_newest_tail_in_order() {
        let history = MarketHistory::new(10);
        assert!(history.is_empty());
        for seq in 1..=6 {
            history.record(status(seq));
        }
        let sequences: Vec<u64> = history.recent(2).iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![5, 6]);
        assert!(history.recent(0).is_empty());
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let history = MarketHistory::new(0);
        history.record(status(1));
        history.record(status(2));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.recent(5).first().unwrap().sequence, 2);
    }
}
