//! Pool of terminal line ids.
//!
//! A line moves `Available → Active → Reserved → Available`. Reserved lines
//! hold a just-printed completion and are only handed out again once they
//! have aged past the reserve timeout, so a fresh spinner never animates
//! over text that was written moments ago.
//!
//! Without a terminal there is no cursor positioning, so ids are never
//! reused and freed lines go straight back to `Available`.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::spinner::SpinnerId;

pub type LineId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Available,
    Active,
    Reserved,
}

#[derive(Debug, Clone)]
pub struct Line {
    pub id: LineId,
    pub state: LineState,
    pub owner: Option<SpinnerId>,
    pub reserved_at: Option<Instant>,
}

/// Occupancy counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub active: usize,
    pub reserved: usize,
    pub available: usize,
    /// Total ids ever minted; also the next fresh id.
    pub minted: usize,
}

#[derive(Debug)]
pub struct LineTracker {
    lines: BTreeMap<LineId, Line>,
    owners: HashMap<SpinnerId, LineId>,
    next_id: LineId,
    terminal: bool,
    timeout: Duration,
}

impl LineTracker {
    pub fn new(terminal: bool, timeout: Duration) -> Self {
        Self {
            lines: BTreeMap::new(),
            owners: HashMap::new(),
            next_id: 0,
            terminal,
            timeout,
        }
    }

    /// Hand `owner` a line. An owner that already holds one gets it back.
    pub fn allocate(&mut self, owner: SpinnerId) -> LineId {
        if let Some(&id) = self.owners.get(&owner) {
            return id;
        }

        let recycled = if self.terminal {
            self.lines
                .values()
                .find(|line| line.state == LineState::Available)
                .map(|line| line.id)
        } else {
            None
        };

        let id = recycled.unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        });

        self.lines.insert(
            id,
            Line {
                id,
                state: LineState::Active,
                owner: Some(owner),
                reserved_at: None,
            },
        );
        self.owners.insert(owner, id);
        id
    }

    /// Release `owner`'s line. Returns the freed id, `None` for unknown owners.
    pub fn deallocate(&mut self, owner: SpinnerId) -> Option<LineId> {
        self.deallocate_at(owner, Instant::now())
    }

    pub fn deallocate_at(&mut self, owner: SpinnerId, now: Instant) -> Option<LineId> {
        let id = self.owners.remove(&owner)?;
        if let Some(line) = self.lines.get_mut(&id) {
            line.owner = None;
            if self.terminal {
                line.state = LineState::Reserved;
                line.reserved_at = Some(now);
            } else {
                line.state = LineState::Available;
                line.reserved_at = None;
            }
        }
        Some(id)
    }

    /// Return reserved lines older than the timeout to the pool.
    pub fn reclaim(&mut self) -> usize {
        self.reclaim_at(Instant::now())
    }

    pub fn reclaim_at(&mut self, now: Instant) -> usize {
        if !self.terminal {
            return 0;
        }
        let mut count = 0;
        for line in self.lines.values_mut() {
            if line.state != LineState::Reserved {
                continue;
            }
            let expired = line
                .reserved_at
                .is_none_or(|at| now.saturating_duration_since(at) > self.timeout);
            if expired {
                line.state = LineState::Available;
                line.reserved_at = None;
                count += 1;
            }
        }
        count
    }

    pub fn line_id_of(&self, owner: SpinnerId) -> Option<LineId> {
        self.owners.get(&owner).copied()
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.get(&id)
    }

    /// Owners currently holding a line.
    pub fn owners(&self) -> impl Iterator<Item = SpinnerId> + '_ {
        self.owners.keys().copied()
    }

    pub fn active_count(&self) -> usize {
        self.owners.len()
    }

    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            minted: self.next_id,
            ..PoolStats::default()
        };
        for line in self.lines.values() {
            match line.state {
                LineState::Active => stats.active += 1,
                LineState::Reserved => stats.reserved += 1,
                LineState::Available => stats.available += 1,
            }
        }
        stats
    }

    /// Forget every line without an owner. Ids keep counting up, so nothing
    /// retired is ever handed out again.
    pub fn retire(&mut self) -> usize {
        let before = self.lines.len();
        self.lines.retain(|_, line| line.state == LineState::Active);
        before - self.lines.len()
    }

    /// Owners whose bookkeeping disagrees between the owner index and the
    /// line table.
    pub fn validate(&self) -> Vec<SpinnerId> {
        let mut bad = Vec::new();

        for (&owner, &id) in &self.owners {
            let consistent = self.lines.get(&id).is_some_and(|line| {
                line.state == LineState::Active && line.owner == Some(owner)
            });
            if !consistent {
                bad.push(owner);
            }
        }

        for line in self.lines.values() {
            match (line.state, line.owner) {
                (LineState::Active, Some(owner)) => {
                    if self.owners.get(&owner) != Some(&line.id) {
                        bad.push(owner);
                    }
                }
                (LineState::Active, None) => {}
                (_, Some(owner)) => bad.push(owner),
                (_, None) => {}
            }
        }

        bad.sort();
        bad.dedup();
        bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const TIMEOUT: Duration = Duration::from_secs(3);

    fn owner(n: u64) -> SpinnerId {
        SpinnerId::from_raw(n)
    }

    fn terminal() -> LineTracker {
        LineTracker::new(true, TIMEOUT)
    }

    fn plain() -> LineTracker {
        LineTracker::new(false, TIMEOUT)
    }

    #[test]
    fn mints_sequential_ids() {
        let mut lines = terminal();
        assert_eq!(lines.allocate(owner(1)), 0);
        assert_eq!(lines.allocate(owner(2)), 1);
        assert_eq!(lines.allocate(owner(3)), 2);
    }

    #[test]
    fn allocate_twice_returns_same_line() {
        let mut lines = terminal();
        let first = lines.allocate(owner(1));
        assert_eq!(lines.allocate(owner(1)), first);
        assert_eq!(lines.active_count(), 1);
    }

    #[test]
    fn deallocate_reserves_in_terminal_mode() {
        let mut lines = terminal();
        let id = lines.allocate(owner(1));
        assert_eq!(lines.deallocate(owner(1)), Some(id));

        let line = lines.line(id).unwrap();
        assert_eq!(line.state, LineState::Reserved);
        assert!(line.owner.is_none());
        assert!(line.reserved_at.is_some());
        assert_eq!(lines.line_id_of(owner(1)), None);
    }

    #[test]
    fn deallocate_unknown_owner_is_noop() {
        let mut lines = terminal();
        assert_eq!(lines.deallocate(owner(42)), None);
        assert_eq!(lines.stats(), PoolStats::default());
    }

    #[test]
    fn reserved_line_not_reused_immediately() {
        let mut lines = terminal();
        let freed = lines.allocate(owner(1));
        lines.deallocate(owner(1));
        assert_ne!(lines.allocate(owner(2)), freed);
    }

    #[test]
    fn reclaim_respects_timeout() {
        let mut lines = terminal();
        let start = Instant::now();
        let id = lines.allocate(owner(1));
        lines.deallocate_at(owner(1), start);

        assert_eq!(lines.reclaim_at(start + Duration::from_secs(1)), 0);
        assert_eq!(lines.line(id).unwrap().state, LineState::Reserved);

        assert_eq!(lines.reclaim_at(start + Duration::from_secs(4)), 1);
        assert_eq!(lines.line(id).unwrap().state, LineState::Available);
    }

    #[test]
    fn reclaimed_line_is_reused() {
        let mut lines = terminal();
        let start = Instant::now();
        lines.allocate(owner(1));
        lines.allocate(owner(2));
        lines.deallocate_at(owner(1), start);
        lines.reclaim_at(start + TIMEOUT + Duration::from_millis(1));

        assert_eq!(lines.allocate(owner(3)), 0);
        assert_eq!(lines.stats().minted, 2);
    }

    #[test]
    fn reuse_prefers_lowest_available() {
        let mut lines = terminal();
        let start = Instant::now();
        for n in 0..4 {
            lines.allocate(owner(n));
        }
        lines.deallocate_at(owner(3), start);
        lines.deallocate_at(owner(1), start);
        lines.reclaim_at(start + TIMEOUT * 2);

        assert_eq!(lines.allocate(owner(10)), 1);
        assert_eq!(lines.allocate(owner(11)), 3);
        assert_eq!(lines.allocate(owner(12)), 4);
    }

    #[test]
    fn plain_mode_never_reuses() {
        let mut lines = plain();
        let id = lines.allocate(owner(1));
        lines.deallocate(owner(1));
        assert_eq!(lines.line(id).unwrap().state, LineState::Available);
        assert_ne!(lines.allocate(owner(2)), id);
    }

    #[test]
    fn plain_mode_reclaim_is_noop() {
        let mut lines = plain();
        lines.allocate(owner(1));
        lines.deallocate(owner(1));
        assert_eq!(lines.reclaim_at(Instant::now() + TIMEOUT * 10), 0);
    }

    #[test]
    fn deallocate_does_not_compact() {
        let mut lines = terminal();
        let a = lines.allocate(owner(1));
        let b = lines.allocate(owner(2));
        let c = lines.allocate(owner(3));
        assert_eq!((a, b, c), (0, 1, 2));

        lines.deallocate(owner(2));

        assert_eq!(lines.line_id_of(owner(1)), Some(0));
        assert_eq!(lines.line_id_of(owner(3)), Some(2));
    }

    #[test]
    fn active_ids_stay_distinct_under_churn() {
        let mut lines = terminal();
        let start = Instant::now();
        let mut live: Vec<u64> = Vec::new();

        for step in 0..500u64 {
            let now = start + Duration::from_millis(step * 40);
            // deterministic mix of allocations, releases and reclaims
            match step % 7 {
                0 | 2 | 3 | 5 => {
                    lines.allocate(owner(step));
                    live.push(step);
                }
                1 | 4 if !live.is_empty() => {
                    let victim = live.remove((step as usize * 31) % live.len());
                    lines.deallocate_at(owner(victim), now);
                }
                _ => {
                    lines.reclaim_at(now);
                }
            }

            let ids: Vec<LineId> = live
                .iter()
                .map(|&n| lines.line_id_of(owner(n)).unwrap())
                .collect();
            let unique: HashSet<LineId> = ids.iter().copied().collect();
            assert_eq!(ids.len(), unique.len(), "duplicate active id at step {step}");
            assert!(lines.validate().is_empty());
        }
    }

    #[test]
    fn stats_count_states() {
        let mut lines = terminal();
        lines.allocate(owner(1));
        lines.allocate(owner(2));
        lines.allocate(owner(3));
        let start = Instant::now();
        lines.deallocate_at(owner(1), start);
        lines.deallocate_at(owner(2), start + TIMEOUT * 2);
        lines.reclaim_at(start + TIMEOUT + Duration::from_millis(1));

        assert_eq!(
            lines.stats(),
            PoolStats {
                active: 1,
                reserved: 1,
                available: 1,
                minted: 3,
            }
        );
    }

    #[test]
    fn retire_drops_free_lines_and_keeps_counting() {
        let mut lines = terminal();
        lines.allocate(owner(1));
        lines.allocate(owner(2));
        lines.deallocate(owner(1));

        assert_eq!(lines.retire(), 1);
        assert_eq!(lines.line_id_of(owner(2)), Some(1));
        assert_eq!(lines.allocate(owner(3)), 2);
    }

    #[test]
    fn validate_clean_pool() {
        let mut lines = terminal();
        lines.allocate(owner(1));
        lines.allocate(owner(2));
        lines.deallocate(owner(1));
        assert!(lines.validate().is_empty());
    }

    #[test]
    fn validate_reports_corruption() {
        let mut lines = terminal();
        let id = lines.allocate(owner(1));
        lines.lines.get_mut(&id).unwrap().state = LineState::Reserved;
        assert_eq!(lines.validate(), vec![owner(1)]);
    }
}
