//! Tournament engine: lifecycle state machine, round scoring, standings.
//!
//! The [`Tournament`] aggregate owns everything about one event: roster,
//! rounds, notes, configuration. Commands return a [`TournamentError`] on
//! any rule violation; the aggregate persists wholesale inside a
//! transaction, and a caller that aborts on error never stores a
//! half-applied command. A few registration checks deliberately run after
//! the upsert (cf. [`Tournament::add_player`]), so the in-memory aggregate
//! may carry the player even when their participation was refused.

pub mod engine;
pub mod models;
pub mod scoring;
pub mod standings;

pub use engine::{ErrorCategory, TournamentError, TournamentResult, random_id};
pub use models::{
    DropReason, Note, NoteLevel, Player, PlayerId, PlayerInfo, PlayerStatus, Round, Score,
    Tournament, TournamentConfig, TournamentState, Vp,
};
pub use standings::Rank;
