//! Tournament data models: scores, players, rounds, notes, configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign};

use crate::seating::RoundSeating;

/// Stable player identifier: a VEKN ID# or a generated temporary id.
pub type PlayerId = String;

/// Tournament lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentState {
    /// Tournament has not begun, registration is open
    #[default]
    Registration,
    /// Check-in is open for the next round
    Checkin,
    /// Round in progress
    Playing,
    /// Waiting for the next round check-in to open
    WaitingForCheckin,
    /// Waiting for the next round to start
    WaitingForStart,
    /// Finals have been played, the tournament is over
    Finished,
}

/// Why a player left the tournament.
///
/// Voluntary drops can be reversed by re-registering; a disqualification can
/// only be lifted by a judge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropReason {
    Drop,
    Disqualified,
}

/// Severity of a judge note
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteLevel {
    #[default]
    Note,
    Override,
    Caution,
    Warning,
}

/// A judge note on a player or a table. Immutable once recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub judge: String,
    pub level: NoteLevel,
    pub text: String,
}

/// Victory points, in quarter-point granularity (0 to 5).
///
/// Stored as quarter points so scores compare exactly and serialize without
/// floating point noise.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Vp(u16);

impl Vp {
    pub const ZERO: Vp = Vp(0);
    /// 5 VP, the most a single table can yield one player.
    pub const MAX: Vp = Vp(20);

    pub fn from_quarters(quarters: u16) -> Self {
        Vp(quarters)
    }

    pub fn whole(points: u16) -> Self {
        Vp(points * 4)
    }

    /// Parse a reported VP value. Accepts quarter-point steps in [0, 5].
    pub fn try_from_f64(value: f64) -> Option<Self> {
        let quarters = value * 4.0;
        if quarters.fract() == 0.0 && (0.0..=20.0).contains(&quarters) {
            Some(Vp(quarters as u16))
        } else {
            None
        }
    }

    pub fn quarters(self) -> u16 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 4.0
    }

    /// Rounded-up whole points: a half VP counts as one for table checks.
    pub fn ceil(self) -> u16 {
        self.0.div_ceil(4)
    }

    pub fn is_fractional(self) -> bool {
        self.0 % 4 != 0
    }
}

impl Add for Vp {
    type Output = Vp;

    fn add(self, rhs: Vp) -> Vp {
        Vp(self.0 + rhs.0)
    }
}

impl AddAssign for Vp {
    fn add_assign(&mut self, rhs: Vp) {
        self.0 += rhs.0;
    }
}

impl fmt::Display for Vp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.as_f64();
        if self.is_fractional() {
            write!(f, "{value}")
        } else {
            write!(f, "{value:.0}")
        }
    }
}

/// A player's score: game wins, victory points, tournament points.
///
/// Field order gives the ranking order: GW first, then VP, then TP.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Score {
    pub gw: u32,
    pub vp: Vp,
    pub tp: u32,
}

impl Score {
    pub fn from_vp(vp: Vp) -> Self {
        Score {
            gw: 0,
            vp,
            tp: 0,
        }
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Score) -> Score {
        Score {
            gw: self.gw + rhs.gw,
            vp: self.vp + rhs.vp,
            tp: self.tp + rhs.tp,
        }
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Score) {
        self.gw += rhs.gw;
        self.vp += rhs.vp;
        self.tp += rhs.tp;
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}GW{}, {}TP)", self.gw, self.vp, self.tp)
    }
}

/// A registered player.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Player {
    /// VEKN ID#, or a generated temporary id prefixed with "P".
    pub id: PlayerId,
    pub name: String,
    /// Opaque deck content from the external deck validator.
    #[serde(default)]
    pub deck: serde_json::Value,
    /// Eligible to be seated in the active round or check-in window.
    pub playing: bool,
    /// Finals seeding rank (1 is best), 0 when unseeded. Kept across finals
    /// reseatings so a toss winner keeps their seat.
    pub seed: u8,
}

impl Player {
    pub fn has_deck(&self) -> bool {
        !self.deck.is_null()
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "#{}", self.id)
        } else {
            write!(f, "{} #{}", self.name, self.id)
        }
    }
}

/// One round: seating, reported results, judge overrides.
///
/// Results mutate until the round is finished; once a later round exists the
/// round is only touched through explicit fix and validate operations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Round {
    pub seating: RoundSeating,
    pub results: BTreeMap<PlayerId, Score>,
    /// Judge overrides accepting odd table scores, keyed by 1-based table
    /// number.
    pub overrides: BTreeMap<usize, Note>,
    pub finals: bool,
}

/// Typed configuration options, combinable as plain booleans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    /// A VEKN ID# is required to register
    pub vekn_required: bool,
    /// A decklist must be submitted before playing
    pub decklist_required: bool,
    /// Players must check in before every round
    pub checkin_each_round: bool,
    /// Players can switch decks between rounds
    pub multideck: bool,
    /// Players can register after the first round has started
    pub register_between: bool,
    /// Staggered structure for 6, 7 or 11 players
    pub staggered: bool,
}

/// The tournament aggregate: the unit of persistence and of locking.
///
/// Owns all players, rounds, and notes exclusively; nothing outside the
/// aggregate references them. A default-constructed tournament has an empty
/// name and stands for "no tournament here".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tournament {
    pub name: String,
    pub config: TournamentConfig,
    /// Maximum rounds a single player may play, 0 for no limit.
    pub max_rounds: usize,
    /// Count of started rounds.
    pub current_round: usize,
    pub state: TournamentState,
    pub players: BTreeMap<PlayerId, Player>,
    pub dropped: BTreeMap<PlayerId, DropReason>,
    pub rounds: Vec<Round>,
    pub notes: BTreeMap<PlayerId, Vec<Note>>,
    /// Finals winner id, empty until the finals are scored.
    pub winner: PlayerId,
    /// Free-form extension data carried along with the aggregate.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Tournament {
    /// Whether a tournament actually exists here.
    pub fn is_open(&self) -> bool {
        !self.name.is_empty()
    }
}

/// A player's standing in the current phase, for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    NotRegistered,
    CheckedIn,
    CheckinRequired,
    DroppedOut,
    Disqualified,
    Playing,
    MissingDeck,
    Waiting,
    CheckedOut,
}

/// Comprehensive player information
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player: Player,
    pub status: PlayerStatus,
    pub rounds: usize,
    pub score: Score,
    pub notes: Vec<Note>,
    /// 1-based table number in the latest round, if seated.
    pub table: Option<usize>,
    /// 1-based seat position in the latest round, if seated.
    pub position: Option<usize>,
}
