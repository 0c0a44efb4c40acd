//! # VTES Tournament
//!
//! A tournament engine for Vampire: The Eternal Struggle, covering the full
//! lifecycle of a multi-round event: registration, check-in, seating handoff,
//! per-round scoring, finals, and final standings.
//!
//! ## Architecture
//!
//! The engine is a state machine over a single serializable aggregate:
//!
//! - **Registration**: players sign up, decklists get validated
//! - **Checkin**: players confirm presence for the next round
//! - **Playing**: a round is in progress, results come in
//! - **WaitingForCheckin / WaitingForStart**: between rounds
//! - **Finished**: finals have been played, a winner is recorded
//!
//! Seating optimization, decklist parsing, and player identity verification
//! are external services consumed through traits ([`seating::SeatingOptimizer`],
//! [`identity::IdentityService`], [`deck::DeckSummary`] as the validator's
//! output). The engine itself owns the rules: score distribution, tie-breaks,
//! rankings, and every lifecycle transition.
//!
//! ## Core Modules
//!
//! - [`tournament`]: aggregate, state machine, round scorer, standings ranker
//! - [`db`]: PostgreSQL persistence with advisory locking and a bounded cache
//! - [`seating`]: seating model and the optimizer service contract
//!
//! ## Example
//!
//! ```
//! use vtes_tournament::tournament::{Tournament, TournamentConfig};
//!
//! let mut tournament = Tournament::default();
//! assert!(!tournament.is_open());
//! tournament.name = "Sunday Standard Constructed".to_string();
//! assert!(tournament.is_open());
//! ```

/// Decklist legality rules and the deck validator output contract.
pub mod deck;
/// Player identity verification service contract.
pub mod identity;
/// Seating model and the external seating optimizer contract.
pub mod seating;

/// Tournament aggregate, state machine, scoring, and standings.
pub mod tournament;
pub use tournament::{
    DropReason, Note, NoteLevel, Player, PlayerId, PlayerInfo, PlayerStatus, Round, Score,
    Tournament, TournamentConfig, TournamentError, TournamentResult, TournamentState, Vp,
};

/// PostgreSQL persistence: pool, configuration, and the tournament store.
pub mod db;
pub use db::{TournamentKey, TournamentStore, UpdateLevel};
