//! Round scorer: per-table tournament point distribution and correctness.
//!
//! Tournament points follow a fixed schedule assigned to victory-point
//! brackets, lowest bracket first. Ties split their brackets' combined pool
//! evenly. A table's score is correct only when every victory point is
//! accounted for, unless a judge recorded an explicit override.

use super::models::{PlayerId, Round, Score, Vp};

/// TP schedule for a 5-player table, lowest VP bracket first.
/// 4-player tables drop the 36-point slot.
const TP_SCHEDULE: [u32; 5] = [12, 24, 36, 48, 60];

impl Round {
    /// Score every table. Returns the 1-based numbers of incorrect tables.
    pub fn score(&mut self) -> Vec<usize> {
        (1..=self.seating.tables_count())
            .filter(|&table_num| !self.score_table(table_num))
            .collect()
    }

    /// Score the table a player sits at. Returns whether that table's score
    /// is correct and complete, or `None` if the player is not seated.
    pub fn score_player(&mut self, player_id: &str) -> Option<bool> {
        let (table_num, _, _) = self.seating.position_of(player_id)?;
        Some(self.score_table(table_num))
    }

    /// Score one table (1-based) and report whether its score is correct.
    ///
    /// Writes the full score distribution back into `results`, so partial
    /// reports still produce a consistent view of the table.
    pub(crate) fn score_table(&mut self, table_num: usize) -> bool {
        let Some(table) = self.seating.table(table_num).map(<[PlayerId]>::to_vec) else {
            return false;
        };
        let mut pool: Vec<u32> = TP_SCHEDULE.to_vec();
        if table.len() == 4 {
            pool.remove(2);
        }
        let mut pool = pool.into_iter();

        // ascending (vp, player) so equal VPs form contiguous brackets
        let mut brackets: Vec<(Vp, PlayerId)> = table
            .iter()
            .map(|id| {
                let vp = self.results.get(id).map_or(Vp::ZERO, |score| score.vp);
                (vp, id.clone())
            })
            .collect();
        brackets.sort();

        let mut start = 0;
        while start < brackets.len() {
            let vp = brackets[start].0;
            let len = brackets[start..].iter().take_while(|(v, _)| *v == vp).count();
            let total: u32 = pool.by_ref().take(len).sum();
            let tp = total / len as u32;
            let gw = u32::from(tp == 60 && vp >= Vp::whole(2));
            for (_, id) in &brackets[start..start + len] {
                self.results.insert(id.clone(), Score { gw, vp, tp });
            }
            start += len;
        }

        if self.overrides.contains_key(&table_num) {
            return true;
        }
        let accounted: u16 = brackets.iter().map(|(vp, _)| vp.ceil()).sum();
        if usize::from(accounted) != table.len() {
            return false;
        }
        if !self.finals {
            // Seat-order check: a player cannot hold a timeout half-point
            // while their predator scored a full VP (the predator would have
            // ousted them).
            let seat_vps: Vec<Vp> = table.iter().map(|id| self.results[id].vp).collect();
            let count = seat_vps.len();
            for seat in 0..count {
                let predator = seat_vps[(seat + count - 1) % count];
                if seat_vps[seat].is_fractional() && predator >= Vp::whole(1) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seating::RoundSeating;
    use crate::tournament::models::{Note, NoteLevel};

    fn ids(n: usize) -> Vec<PlayerId> {
        (1..=n).map(|i| format!("{i}")).collect()
    }

    fn round_with_vps(vps: &[f64]) -> Round {
        let mut round = Round {
            seating: RoundSeating::from_players(ids(vps.len())).unwrap(),
            ..Round::default()
        };
        for (i, vp) in vps.iter().enumerate() {
            round.results.insert(
                format!("{}", i + 1),
                Score::from_vp(Vp::try_from_f64(*vp).unwrap()),
            );
        }
        round
    }

    #[test]
    fn test_sweep_on_five_player_table() {
        // One player takes the whole table
        let mut round = round_with_vps(&[5.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(round.score_table(1));
        let winner = &round.results["1"];
        assert_eq!((winner.gw, winner.vp, winner.tp), (1, Vp::whole(5), 60));
        // the four losers split 12+24+36+48 evenly
        for loser in ["2", "3", "4", "5"] {
            assert_eq!(round.results[loser].tp, 30);
            assert_eq!(round.results[loser].gw, 0);
        }
    }

    #[test]
    fn test_four_player_table_drops_middle_slot() {
        let mut round = round_with_vps(&[4.0, 0.0, 0.0, 0.0]);
        assert!(round.score_table(1));
        assert_eq!(round.results["1"].tp, 60);
        assert_eq!(round.results["1"].gw, 1);
        // losers split 12+24+48
        for loser in ["2", "3", "4"] {
            assert_eq!(round.results[loser].tp, 28);
        }
    }

    #[test]
    fn test_tied_top_bracket_yields_no_game_win() {
        // two players tied at 2 VP: top bracket contested, no one gets 60 TP
        let mut round = round_with_vps(&[2.0, 2.0, 0.0, 0.0, 1.0]);
        assert!(round.score_table(1));
        assert_eq!(round.results["1"].tp, 54);
        assert_eq!(round.results["2"].tp, 54);
        assert_eq!(round.results["1"].gw, 0);
        assert_eq!(round.results["2"].gw, 0);
    }

    #[test]
    fn test_game_win_requires_two_vp() {
        // Uncontested top bracket but only 1 VP: no game win
        let mut round = round_with_vps(&[1.0, 0.0, 0.0, 0.0]);
        round.overrides.insert(
            1,
            Note {
                judge: "j".into(),
                level: NoteLevel::Override,
                text: "timeout".into(),
            },
        );
        assert!(round.score_table(1));
        assert_eq!(round.results["1"].tp, 60);
        assert_eq!(round.results["1"].gw, 0);
    }

    #[test]
    fn test_incomplete_report_is_incorrect() {
        // only one player reported, VPs don't add up to the table size
        let mut round = round_with_vps(&[4.0, 0.0, 0.0, 0.0, 0.0]);
        round.results.remove("2"); // no matter, missing entries default to 0
        round
            .results
            .insert("1".to_string(), Score::from_vp(Vp::whole(2)));
        assert!(!round.score_table(1));
        assert_eq!(round.score(), vec![1]);
    }

    #[test]
    fn test_override_accepts_odd_score_without_changing_it() {
        let mut round = round_with_vps(&[2.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(!round.score_table(1));
        let before = round.results.clone();
        round.overrides.insert(
            1,
            Note {
                judge: "j".into(),
                level: NoteLevel::Override,
                text: "player dropped, VPs not attributed".into(),
            },
        );
        assert!(round.score_table(1));
        assert_eq!(round.results, before);
    }

    #[test]
    fn test_ousted_player_cannot_keep_half_point() {
        // seat 2 holds a timeout half-point but seat 1 (their predator)
        // scored a full VP: contradiction
        let mut round = round_with_vps(&[1.0, 0.5, 2.0, 0.0, 1.0]);
        assert!(!round.score_table(1));
        // a half-point is fine when the holder's predator got nothing
        let mut round = round_with_vps(&[0.0, 0.5, 3.0, 0.0, 1.0]);
        assert!(round.score_table(1));
    }

    #[test]
    fn test_finals_skip_the_seat_order_check() {
        let mut round = round_with_vps(&[1.0, 0.5, 2.0, 0.0, 1.0]);
        round.finals = true;
        assert!(round.score_table(1));
    }

    #[test]
    fn test_full_round_reports_incorrect_tables() {
        let mut round = Round {
            seating: RoundSeating::from_players(ids(9)).unwrap(),
            ..Round::default()
        };
        // table 1 (players 1-5) fully reported, table 2 (players 6-9) not
        for (id, vp) in [("1", 0.5), ("2", 2.0), ("3", 1.0), ("4", 1.0)] {
            round
                .results
                .insert(id.to_string(), Score::from_vp(Vp::try_from_f64(vp).unwrap()));
        }
        assert_eq!(round.score(), vec![2]);
    }
}
