//! Seating model and the external seating optimizer contract.
//!
//! A round's seating is an ordered list of tables, each an ordered list of
//! player ids. The combinatorial optimization itself (avoiding repeated
//! predator-prey relationships across rounds) is an external service consumed
//! through the [`SeatingOptimizer`] trait.

use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::tournament::PlayerId;

/// Default iteration budget handed to the optimizer.
pub const DEFAULT_ITERATIONS: u64 = 30_000;

/// Seating errors
#[derive(Debug, Error)]
pub enum SeatingError {
    /// Player counts that cannot be split into tables of 4 and 5.
    #[error("cannot seat {0} players on tables of 4 or 5")]
    BadPlayerCount(usize),

    #[error("seating service error: {0}")]
    Service(String),
}

/// Progress callback for long-running optimizer runs.
///
/// Invoked with the current step count, on the order of once every 1/100th of
/// the configured iteration budget, so callers can report progress without
/// blocking other tournaments.
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// A progress callback that ignores all updates.
pub fn no_progress() -> ProgressFn {
    Arc::new(|_| {})
}

/// One round's seating: ordered tables of 4 or 5 players each.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundSeating {
    tables: Vec<Vec<PlayerId>>,
}

impl RoundSeating {
    /// Split players into tables of 5 and 4, in the given order.
    ///
    /// Fails for counts below 4 and for 6, 7 and 11 players, which cannot be
    /// arranged into full tables (those counts require a staggered structure).
    pub fn from_players(players: Vec<PlayerId>) -> Result<Self, SeatingError> {
        let count = players.len();
        if count < 4 {
            return Err(SeatingError::BadPlayerCount(count));
        }
        let tables_count = count.div_ceil(5);
        let Some(fives) = count.checked_sub(4 * tables_count) else {
            return Err(SeatingError::BadPlayerCount(count));
        };
        let mut tables = Vec::with_capacity(tables_count);
        let mut players = players.into_iter();
        for table_index in 0..tables_count {
            let size = if table_index < fives { 5 } else { 4 };
            tables.push(players.by_ref().take(size).collect());
        }
        Ok(Self { tables })
    }

    /// Build a seating from pre-formed tables, as returned by the optimizer.
    pub fn from_tables(tables: Vec<Vec<PlayerId>>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[Vec<PlayerId>] {
        &self.tables
    }

    pub fn tables_count(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table contents by 1-based table number.
    pub fn table(&self, table_num: usize) -> Option<&[PlayerId]> {
        self.tables.get(table_num.checked_sub(1)?).map(Vec::as_slice)
    }

    /// All seated players, in table then seat order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.tables.iter().flatten()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.players().any(|p| p == player_id)
    }

    /// Locate a player: (1-based table number, 1-based position, table size).
    pub fn position_of(&self, player_id: &str) -> Option<(usize, usize, usize)> {
        for (table_index, table) in self.tables.iter().enumerate() {
            if let Some(seat_index) = table.iter().position(|p| p == player_id) {
                return Some((table_index + 1, seat_index + 1, table.len()));
            }
        }
        None
    }

    /// Shuffle seats across the whole round, preserving table sizes.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let sizes: Vec<usize> = self.tables.iter().map(Vec::len).collect();
        let mut players: Vec<PlayerId> = self.tables.drain(..).flatten().collect();
        players.shuffle(rng);
        let mut players = players.into_iter();
        for size in sizes {
            self.tables.push(players.by_ref().take(size).collect());
        }
    }

    /// Append a player to a table (1-based). The caller checks occupancy.
    pub fn add_to_table(&mut self, table_num: usize, player_id: PlayerId) {
        if let Some(table) = self.tables.get_mut(table_num - 1) {
            table.push(player_id);
        }
    }

    /// Remove a player wherever they sit. Returns the 1-based table number.
    pub fn remove_player(&mut self, player_id: &str) -> Option<usize> {
        for (table_index, table) in self.tables.iter_mut().enumerate() {
            if let Some(seat_index) = table.iter().position(|p| p == player_id) {
                table.remove(seat_index);
                return Some(table_index + 1);
            }
        }
        None
    }
}

/// External seating optimization service.
///
/// The engine hands over round seatings and consumes the optimized
/// arrangement; how the optimization works (simulated annealing or otherwise)
/// is the service's concern. The returned score is an opaque comparison value,
/// lower is better, used to pick the best of several parallel runs.
#[async_trait]
pub trait SeatingOptimizer: Send + Sync {
    /// Optimize a sequence of round seatings.
    ///
    /// The first `fixed` rounds have already been played and must not be
    /// altered. The latest round is included, not yet optimized. Long runs
    /// must happen off the main scheduling path and report through `progress`.
    async fn optimize(
        &self,
        rounds: Vec<RoundSeating>,
        fixed: usize,
        iterations: u64,
        progress: ProgressFn,
    ) -> Result<(Vec<RoundSeating>, f64), SeatingError>;

    /// Generate a staggered schedule for 6, 7 or 11 players, where everyone
    /// sits out some rounds but ends up playing `rounds_per_player` of them.
    async fn staggered_rounds(
        &self,
        players: Vec<PlayerId>,
        rounds_per_player: usize,
    ) -> Result<Vec<RoundSeating>, SeatingError>;

    /// Re-optimize a single table's adjacency score in the latest round,
    /// after a manual seat adjustment. `table_index` is 0-based.
    fn optimize_table(&self, rounds: &mut [RoundSeating], table_index: usize);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ids(n: usize) -> Vec<PlayerId> {
        (1..=n).map(|i| format!("P{i}")).collect()
    }

    #[test]
    fn test_from_players_table_sizes() {
        for (count, expected) in [
            (4, vec![4]),
            (5, vec![5]),
            (8, vec![4, 4]),
            (9, vec![5, 4]),
            (10, vec![5, 5]),
            (12, vec![4, 4, 4]),
            (13, vec![5, 4, 4]),
            (21, vec![5, 4, 4, 4, 4]),
        ] {
            let seating = RoundSeating::from_players(ids(count)).unwrap();
            let sizes: Vec<usize> = seating.tables().iter().map(Vec::len).collect();
            assert_eq!(sizes, expected, "bad split for {count} players");
        }
    }

    #[test]
    fn test_from_players_rejects_ambiguous_counts() {
        for count in [0, 1, 2, 3, 6, 7, 11] {
            assert!(
                RoundSeating::from_players(ids(count)).is_err(),
                "{count} players should not seat"
            );
        }
    }

    #[test]
    fn test_position_of() {
        let seating = RoundSeating::from_players(ids(9)).unwrap();
        assert_eq!(seating.position_of("P1"), Some((1, 1, 5)));
        assert_eq!(seating.position_of("P6"), Some((2, 1, 4)));
        assert_eq!(seating.position_of("P9"), Some((2, 4, 4)));
        assert_eq!(seating.position_of("nobody"), None);
    }

    #[test]
    fn test_shuffle_preserves_players_and_sizes() {
        let mut seating = RoundSeating::from_players(ids(13)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        seating.shuffle(&mut rng);
        let sizes: Vec<usize> = seating.tables().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 4, 4]);
        let mut players: Vec<&PlayerId> = seating.players().collect();
        players.sort();
        players.dedup();
        assert_eq!(players.len(), 13);
    }

    #[test]
    fn test_add_and_remove() {
        let mut seating = RoundSeating::from_players(ids(8)).unwrap();
        seating.add_to_table(2, "P9".to_string());
        assert_eq!(seating.position_of("P9"), Some((2, 5, 5)));
        assert_eq!(seating.remove_player("P9"), Some(2));
        assert!(!seating.contains("P9"));
        assert_eq!(seating.remove_player("P9"), None);
    }
}
