//! The authoritative market snapshot.
//!
//! [`MarketStore`] holds the current [`MarketState`] behind a
//! `tokio::sync::watch` channel. Writers replace the whole snapshot; readers
//! clone the `Arc` under a momentary borrow and never hold a lock while
//! using it. Every commit is stamped with the next sequence number, which
//! gives all commits and overrides a single total order.

use std::sync::Arc;

use surge_types::MarketState;
use tokio::sync::watch;
use tracing::debug;

use crate::config::MarketConfig;
use crate::error::MarketError;

/// Lower bound of the traffic factor (free flow).
pub const TRAFFIC_MIN: f64 = 1.0;

/// Upper bound of the traffic factor.
pub const TRAFFIC_MAX: f64 = 2.5;

/// Clamping policy shared by the simulator and the override path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketBounds {
    /// Lowest allowed demand/supply level.
    pub min_level: f64,
    /// Highest allowed demand/supply level.
    pub max_level: f64,
}

impl MarketBounds {
    /// Bounds from the market configuration.
    pub const fn from_config(config: &MarketConfig) -> Self {
        Self {
            min_level: config.min_level,
            max_level: config.max_level,
        }
    }

    /// Clamp a demand or supply level into range.
    pub const fn clamp_level(&self, value: f64) -> f64 {
        value.clamp(self.min_level, self.max_level)
    }

    /// Clamp a traffic factor into `[TRAFFIC_MIN, TRAFFIC_MAX]`.
    pub const fn clamp_traffic(value: f64) -> f64 {
        value.clamp(TRAFFIC_MIN, TRAFFIC_MAX)
    }

    /// Whether a snapshot already satisfies the bounds.
    pub fn contains(&self, state: &MarketState) -> bool {
        let levels = self.min_level..=self.max_level;
        levels.contains(&state.demand)
            && levels.contains(&state.supply)
            && (TRAFFIC_MIN..=TRAFFIC_MAX).contains(&state.traffic_factor)
    }

    /// Clamp every numeric field. Non-finite fields take the value from
    /// `fallback`.
    pub fn sanitize(&self, proposed: MarketState, fallback: &MarketState) -> MarketState {
        let pick = |value: f64, previous: f64| if value.is_finite() { value } else { previous };
        MarketState {
            demand: self.clamp_level(pick(proposed.demand, fallback.demand)),
            supply: self.clamp_level(pick(proposed.supply, fallback.supply)),
            traffic_factor: Self::clamp_traffic(pick(
                proposed.traffic_factor,
                fallback.traffic_factor,
            )),
            ..proposed
        }
    }
}

impl Default for MarketBounds {
    fn default() -> Self {
        Self::from_config(&MarketConfig::default())
    }
}

/// Single authoritative holder of the current market snapshot.
#[derive(Debug)]
pub struct MarketStore {
    current: watch::Sender<Option<Arc<MarketState>>>,
    bounds: MarketBounds,
}

impl MarketStore {
    /// An empty store. Reads fail with [`MarketError::StoreUnavailable`]
    /// until the first commit.
    pub fn new(bounds: MarketBounds) -> Self {
        Self {
            current: watch::Sender::new(None),
            bounds,
        }
    }

    /// The clamping policy this store applies to overrides.
    pub const fn bounds(&self) -> MarketBounds {
        self.bounds
    }

    /// The current snapshot.
    pub fn read(&self) -> Result<Arc<MarketState>, MarketError> {
        self.current
            .borrow()
            .clone()
            .ok_or(MarketError::StoreUnavailable)
    }

    /// Replace the snapshot with `next`.
    ///
    /// Values are stored as given; the caller is responsible for clamping.
    /// The sequence number is set to the previous one plus 1 (1 for the
    /// first commit) and the timestamp is raised to the previous one if the
    /// clock went backwards.
    pub fn commit(&self, next: MarketState) -> Arc<MarketState> {
        self.commit_with(next, |_| {})
    }

    /// [`commit`](Self::commit), then run `on_commit` while the write guard
    /// is still held.
    ///
    /// Hooks therefore observe snapshots in commit order.
    pub fn commit_with<F>(&self, next: MarketState, on_commit: F) -> Arc<MarketState>
    where
        F: FnOnce(&MarketState),
    {
        let mut committed = None;
        self.current.send_modify(|slot| {
            let stamped = Arc::new(stamp(next, slot.as_deref()));
            on_commit(stamped.as_ref());
            *slot = Some(Arc::clone(&stamped));
            committed = Some(stamped);
        });
        // send_modify always runs the closure.
        let committed = committed.unwrap_or_else(|| Arc::new(next));
        debug!(
            sequence = committed.sequence,
            demand = committed.demand,
            supply = committed.supply,
            "Market state committed"
        );
        committed
    }

    /// Read-modify-write the snapshot atomically.
    ///
    /// `mutator` runs under the store's write guard, so no commit or other
    /// override can interleave. Its result is re-clamped with the store's
    /// [`MarketBounds`]; non-finite values keep the previous value.
    pub fn force_set<F>(&self, mutator: F) -> Result<Arc<MarketState>, MarketError>
    where
        F: FnOnce(&MarketState) -> MarketState,
    {
        self.force_set_with(mutator, |_| {})
    }

    /// [`force_set`](Self::force_set), then run `on_commit` while the write
    /// guard is still held.
    pub fn force_set_with<F, H>(
        &self,
        mutator: F,
        on_commit: H,
    ) -> Result<Arc<MarketState>, MarketError>
    where
        F: FnOnce(&MarketState) -> MarketState,
        H: FnOnce(&MarketState),
    {
        let bounds = self.bounds;
        let mut outcome = Err(MarketError::StoreUnavailable);
        self.current.send_if_modified(|slot| {
            let Some(previous) = slot.as_deref() else {
                return false;
            };
            let proposed = bounds.sanitize(mutator(previous), previous);
            let next = Arc::new(stamp(proposed, Some(previous)));
            on_commit(next.as_ref());
            *slot = Some(Arc::clone(&next));
            outcome = Ok(next);
            true
        });
        outcome
    }

    /// A receiver that wakes on every commit and override.
    pub fn subscribe_changes(&self) -> watch::Receiver<Option<Arc<MarketState>>> {
        self.current.subscribe()
    }
}

fn stamp(mut next: MarketState, previous: Option<&MarketState>) -> MarketState {
    match previous {
        Some(prev) => {
            next.sequence = prev.sequence.saturating_add(1);
            if next.timestamp < prev.timestamp {
                next.timestamp = prev.timestamp;
            }
        }
        None => next.sequence = 1,
    }
    next
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::thread;

    use chrono::{Duration, Utc};
    use surge_types::Weather;

    use super::*;

    fn baseline() -> MarketState {
        MarketState::new(1.0, 1.0, Weather::Clear, 1.0, Utc::now())
    }

    #[test]
    fn read_before_first_commit_is_unavailable() {
        let store = MarketStore::new(MarketBounds::default());
        assert_eq!(store.read().unwrap_err(), MarketError::StoreUnavailable);
        assert_eq!(
            store.force_set(|s| *s).unwrap_err(),
            MarketError::StoreUnavailable
        );
    }

    #[test]
    fn commit_stamps_increasing_sequence() {
        let store = MarketStore::new(MarketBounds::default());
        let first = store.commit(baseline());
        let second = store.commit(baseline());
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(store.read().unwrap().sequence, 2);
    }

    #[test]
    fn timestamp_never_goes_backwards() {
        let store = MarketStore::new(MarketBounds::default());
        let first = store.commit(baseline());
        let mut stale = baseline();
        stale.timestamp = first.timestamp - Duration::seconds(30);
        let second = store.commit(stale);
        assert_eq!(second.timestamp, first.timestamp);
    }

    #[test]
    fn force_set_clamps_and_keeps_previous_for_non_finite() {
        let store = MarketStore::new(MarketBounds::default());
        store.commit(baseline());

        let high = store
            .force_set(|s| MarketState { demand: 50.0, ..*s })
            .unwrap();
        assert!((high.demand - 2.0).abs() < f64::EPSILON);
        assert_eq!(high.sequence, 2);

        let nan = store
            .force_set(|s| MarketState {
                supply: f64::NAN,
                traffic_factor: 0.2,
                ..*s
            })
            .unwrap();
        assert!((nan.supply - 1.0).abs() < f64::EPSILON);
        assert!((nan.traffic_factor - TRAFFIC_MIN).abs() < f64::EPSILON);
    }

    #[test]
    fn hooks_see_the_stamped_snapshot() {
        let store = MarketStore::new(MarketBounds::default());
        let mut seen = Vec::new();
        let first = store.commit_with(baseline(), |s| seen.push(s.sequence));
        let second = store
            .force_set_with(|s| MarketState { demand: 9.0, ..*s }, |s| {
                seen.push(s.sequence);
                assert!((s.demand - 2.0).abs() < f64::EPSILON);
            })
            .unwrap();
        assert_eq!(seen, vec![first.sequence, second.sequence]);
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn force_set_hook_skipped_before_first_commit() {
        let store = MarketStore::new(MarketBounds::default());
        let mut called = false;
        let result = store.force_set_with(|s| *s, |_| called = true);
        assert_eq!(result.unwrap_err(), MarketError::StoreUnavailable);
        assert!(!called);
    }

    #[test]
    fn sanitize_clamps_every_field() {
        let bounds = MarketBounds::default();
        let wild = MarketState::new(-3.0, 9.0, Weather::Snow, 7.0, Utc::now());
        let clean = bounds.sanitize(wild, &baseline());
        assert!(bounds.contains(&clean));
        assert_eq!(clean.weather, Weather::Snow);
    }

    #[test]
    fn concurrent_overrides_never_expose_out_of_range_state() {
        let store = MarketStore::new(MarketBounds::default());
        store.commit(baseline());
        let bounds = store.bounds();

        thread::scope(|scope| {
            for writer in 0..4_u32 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..250_u32 {
                        let wild = f64::from(i % 7) - 2.0 + f64::from(writer);
                        store
                            .force_set(|s| MarketState {
                                demand: wild * 3.0,
                                supply: -wild,
                                ..*s
                            })
                            .unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..250 {
                    let mut next = *store.read().unwrap();
                    next.demand = bounds.clamp_level(next.demand * 1.1);
                    store.commit(next);
                }
            });
            scope.spawn(|| {
                for _ in 0..1000 {
                    let snapshot = store.read().unwrap();
                    assert!(bounds.contains(&snapshot));
                }
            });
        });

        // 4 * 250 overrides + 250 commits + the initial commit.
        assert_eq!(store.read().unwrap().sequence, 1251);
    }

    #[tokio::test]
    async fn change_receiver_wakes_on_commit() {
        let store = MarketStore::new(MarketBounds::default());
        let mut changes = store.subscribe_changes();
        store.commit(baseline());
        changes.changed().await.unwrap();
        assert_eq!(changes.borrow().as_ref().unwrap().sequence, 1);
    }
}
