//! Standings ranker: aggregates finalized rounds into ordered rankings.
//!
//! Every call re-scores every finished round, so late VP fixes can never
//! leave stale standings behind. Ranking keys, in descending order:
//! still-in before dropped, finals winner first, total score, finals seed
//! (unseeded last), then a toss or the player id for deterministic order.

use rand::{Rng, RngCore};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use super::engine::{TournamentError, TournamentResult};
use super::models::{PlayerId, Score, Tournament, TournamentState};

/// One standings entry: rank, player id, total score.
pub type Rank = (usize, PlayerId, Score);

impl Tournament {
    /// Compute the winner (if any) and the full ranking, deterministically.
    pub fn standings(&mut self) -> TournamentResult<(Option<PlayerId>, Vec<Rank>)> {
        self.compute_standings(None)
    }

    /// Compute standings with a random toss breaking exact ties.
    ///
    /// Used when seeding finals: the toss order is then persisted through
    /// [`super::models::Player::seed`], so a toss winner keeps their seat on
    /// recomputation.
    pub fn standings_with_toss<R: RngCore>(
        &mut self,
        rng: &mut R,
    ) -> TournamentResult<(Option<PlayerId>, Vec<Rank>)> {
        self.compute_standings(Some(rng))
    }

    fn compute_standings(
        &mut self,
        toss: Option<&mut dyn RngCore>,
    ) -> TournamentResult<(Option<PlayerId>, Vec<Rank>)> {
        // The round being played is not settled yet, leave it out of the
        // re-validation (its partial results still count toward totals).
        let settled = if self.state == TournamentState::Playing {
            self.rounds.len().saturating_sub(1)
        } else {
            self.rounds.len()
        };
        let mut winner: Option<PlayerId> = None;
        for index in 0..settled {
            // score again, some VP fixes might have happened
            let incorrect = self.rounds[index].score();
            if !incorrect.is_empty() {
                return Err(TournamentError::IncorrectScore {
                    round: index + 1,
                    tables: incorrect,
                });
            }
            if self.rounds[index].finals && !self.rounds[index].results.is_empty() {
                let best = self
                    .rounds[index]
                    .results
                    .iter()
                    .max_by_key(|&(id, score)| (*score, Reverse(self.seed_of(id))))
                    .map(|(id, _)| id.clone());
                if let Some(id) = best {
                    // winning the finals counts as a GW even with fewer than
                    // 2 VPs, cf. the VEKN rating system
                    if let Some(score) = self.rounds[index].results.get_mut(&id) {
                        score.gw = 1;
                    }
                    winner = Some(id);
                }
            }
        }

        let mut totals: BTreeMap<PlayerId, Score> = BTreeMap::new();
        for round in &self.rounds {
            for (id, score) in &round.results {
                *totals.entry(id.clone()).or_default() += *score;
            }
        }

        let tosses: HashMap<PlayerId, u64> = match toss {
            Some(rng) => totals
                .keys()
                .map(|id| (id.clone(), rng.random::<u64>()))
                .collect(),
            None => HashMap::new(),
        };
        let mut ordered: Vec<(PlayerId, Score)> = totals.into_iter().collect();
        ordered.sort_by_key(|(id, score)| {
            Reverse((
                !self.dropped.contains_key(id),
                winner.as_deref() == Some(id.as_str()),
                *score,
                self.seed_sort_key(id),
                tosses.get(id).copied(),
                id.clone(),
            ))
        });

        let mut ranking = Vec::with_capacity(ordered.len());
        let mut rank = 1;
        let mut last: Option<Score> = Some(Score::default());
        for (position, (id, score)) in ordered.into_iter().enumerate() {
            let position = position + 1;
            if self.dropped.contains_key(&id) {
                // dropped players take their positional index, never a tie
                last = None;
                rank = position;
            } else {
                if winner.is_some() && position > 1 && position < 6 {
                    // finalists 2-5 all display as second place
                    rank = 2;
                } else if last != Some(score) {
                    rank = position;
                }
                last = Some(score);
            }
            ranking.push((rank, id, score));
        }

        self.winner = winner.clone().unwrap_or_default();
        Ok((winner, ranking))
    }

    fn seed_of(&self, player_id: &str) -> u8 {
        self.players.get(player_id).map_or(u8::MAX, |p| p.seed)
    }

    /// Higher is better: seed 1 sorts first, unseeded players sort last.
    fn seed_sort_key(&self, player_id: &str) -> i32 {
        match self.players.get(player_id).map(|p| p.seed) {
            Some(seed) if seed > 0 => -i32::from(seed),
            _ => i32::MIN,
        }
    }
}
