//! Tournament state machine: lifecycle transitions and roster management.
//!
//! All rule violations are recoverable errors carrying a user-facing
//! message; callers abort the enclosing persistence transaction on error, so
//! a failed command never leaves a partially mutated aggregate behind.

use rand::Rng;
use thiserror::Error;

use crate::deck::{DeckError, DeckSummary};
use crate::identity::{IdentityError, IdentityService};
use crate::seating::{
    DEFAULT_ITERATIONS, ProgressFn, RoundSeating, SeatingError, SeatingOptimizer,
};

use super::models::{
    DropReason, Note, NoteLevel, Player, PlayerId, PlayerInfo, PlayerStatus, Round, Score,
    Tournament, TournamentState, Vp,
};

/// Tournament command errors.
///
/// Everything except [`TournamentError::Internal`] is a normal, recoverable
/// failure: the message explains why the command was not performed.
#[derive(Debug, Error)]
pub enum TournamentError {
    // -- registration and check-in
    #[error("Only a judge can register a player without a VEKN ID#")]
    VeknIdRequired,

    #[error("Player was disqualified: only a judge can reinstate them")]
    DisqualifiedPlayer,

    #[error("Tournament is staggered, no more registration allowed")]
    StaggeredRegistrationClosed,

    #[error("The tournament has started: too late to change deck")]
    DeckChangeClosed,

    #[error(transparent)]
    Deck(#[from] DeckError),

    #[error("A decklist is required to participate")]
    DecklistRequired,

    #[error("The player has reached the maximum number of rounds")]
    MaxRoundsReached,

    #[error("Player is not registered")]
    PlayerNotRegistered,

    #[error("Player is already disqualified")]
    AlreadyDisqualified,

    #[error(transparent)]
    Identity(#[from] IdentityError),

    // -- rounds
    #[error("No check-in for staggered tournaments")]
    NoStaggeredCheckin,

    #[error("The current round must be finished first")]
    RoundInProgress,

    #[error("Check players in before starting the round")]
    CheckinRequired,

    #[error("Finish the previous round before starting a new one")]
    PreviousRoundUnfinished,

    #[error("Tournament is finished")]
    TournamentFinished,

    #[error("More players are required")]
    NotEnoughPlayers,

    #[error("A staggered tournament structure is required for 6, 7 or 11 players")]
    StaggeredStructureRequired,

    #[error("Staggered tournaments cannot allow registration between rounds")]
    StaggeredRegisterBetween,

    #[error("The tournament has already started: staggering is not possible anymore")]
    TooLateToStagger,

    #[error("A staggered tournament requires exactly 6, 7 or 11 players")]
    StaggeredPlayerCount,

    #[error("The tournament has started: unable to modify its structure")]
    StructureFrozen,

    #[error("Seating cannot be adjusted in a staggered tournament")]
    StaggeredSeatingFixed,

    #[error("No round in progress")]
    NoRound,

    #[error("Invalid round number {0}")]
    InvalidRoundNumber(usize),

    #[error("Round {0} has yet to be played")]
    RoundNotPlayed(usize),

    #[error("Invalid table number")]
    InvalidTableNumber,

    #[error("Table has 5 players already")]
    TableFull,

    #[error("Table has only 4 players, unable to remove one")]
    TableAtMinimum,

    #[error("Player is not playing this round")]
    PlayerNotSeated,

    #[error("Results have been entered, the round cannot be undone")]
    RoundHasResults,

    // -- scoring
    #[error("VPs must be between 0 and 5, in quarter points")]
    InvalidVp,

    #[error("Incorrect score for tables {tables:?} in round {round}")]
    IncorrectScore { round: usize, tables: Vec<usize> },

    #[error(transparent)]
    Seating(#[from] SeatingError),

    // -- infrastructure
    #[error("A tournament is already in progress")]
    AlreadyInProgress,

    #[error("No tournament in progress")]
    NoTournament,

    #[error("Another update is in progress, try again")]
    Contention,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bug-class invariant breach. Logged, never shown verbatim to users.
    #[error("Internal error")]
    Internal(String),
}

/// Coarse error classes, used to decide how a failure is surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rule violation or malformed input: show the message, state untouched.
    Validation,
    /// Lock contention: ask the caller to try again.
    Contention,
    /// An external dependency is unavailable.
    Dependency,
    /// A bug: log it, show a generic error.
    Internal,
}

impl TournamentError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TournamentError::Contention => ErrorCategory::Contention,
            TournamentError::Database(_) | TournamentError::Seating(SeatingError::Service(_)) => {
                ErrorCategory::Dependency
            }
            TournamentError::Identity(IdentityError::Unavailable(_)) => ErrorCategory::Dependency,
            TournamentError::Serialization(_) | TournamentError::Internal(_) => {
                ErrorCategory::Internal
            }
            _ => ErrorCategory::Validation,
        }
    }
}

pub type TournamentResult<T> = Result<T, TournamentError>;

/// Alphabet for temporary player ids: no 0/O, 2/Z or I/l confusion.
const ID_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ13456789";

/// Short readable random id: 40 bits, base 32. Statistically collision-free
/// for realistic tournament sizes.
pub fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut bits = rng.random::<u64>() & ((1 << 40) - 1);
    let mut id = String::with_capacity(8);
    for _ in 0..8 {
        id.push(char::from(ID_ALPHABET[(bits % 32) as usize]));
        bits /= 32;
    }
    id
}

impl Tournament {
    /// Register a player, or check them in, or complete their information.
    ///
    /// Idempotent upsert: call it again with the same id to fill in name or
    /// deck piece by piece. Without an id, a temporary one is generated
    /// (judges only, when a VEKN ID# is required). Returns the player id.
    pub async fn add_player<R: Rng + ?Sized>(
        &mut self,
        id: Option<&str>,
        name: Option<String>,
        deck: Option<DeckSummary>,
        judge: bool,
        identity: &dyn IdentityService,
        rng: &mut R,
    ) -> TournamentResult<PlayerId> {
        let mut temp_id = false;
        let id = match id.map(|v| v.trim_start_matches('#')).filter(|v| !v.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                if self.config.vekn_required && !judge {
                    return Err(TournamentError::VeknIdRequired);
                }
                temp_id = true;
                format!("P{}", random_id(rng))
            }
        };
        if self.players.contains_key(&id) {
            match self.dropped.get(&id) {
                Some(DropReason::Disqualified) if !judge => {
                    return Err(TournamentError::DisqualifiedPlayer);
                }
                Some(_) => {
                    self.dropped.remove(&id);
                }
                None => {}
            }
        } else if self.config.staggered {
            return Err(TournamentError::StaggeredRegistrationClosed);
        }
        if let Some(summary) = &deck {
            if !judge && self.current_round > 0 && !self.config.multideck {
                return Err(TournamentError::DeckChangeClosed);
            }
            summary.check_legal()?;
        }
        let playing = self.state == TournamentState::Checkin
            || (self.state == TournamentState::WaitingForStart
                && (judge || self.config.register_between));
        if let Some(player) = self.players.get_mut(&id) {
            if let Some(name) = name {
                player.name = name;
            }
            if let Some(summary) = deck {
                player.deck = summary.deck;
            }
            // mid-round calls only complete information, they must not
            // unseat a playing player
            if self.state != TournamentState::Playing {
                player.playing = playing;
            }
        } else {
            let name = match name {
                Some(name) => name,
                None if temp_id => String::new(),
                None => identity.resolve(&id).await?,
            };
            self.players.insert(
                id.clone(),
                Player {
                    id: id.clone(),
                    name,
                    deck: deck.map(|d| d.deck).unwrap_or(serde_json::Value::Null),
                    playing,
                    seed: 0,
                },
            );
        }
        if self.max_rounds > 0 && self.player_rounds_played(&id) >= self.max_rounds {
            return Err(TournamentError::MaxRoundsReached);
        }
        let player = &self.players[&id];
        if player.playing && self.config.decklist_required && !player.has_deck() {
            return Err(TournamentError::DecklistRequired);
        }
        Ok(id)
    }

    /// Remove a player from the tournament.
    ///
    /// A voluntary drop before any round exists removes the player entirely;
    /// afterwards they are retained but excluded from future play. Voluntary
    /// drops can always come back; disqualified players only via a judge.
    pub fn drop_player(&mut self, player_id: &str, reason: DropReason) -> TournamentResult<()> {
        self.check_player(player_id)?;
        if self.dropped.get(player_id) == Some(&DropReason::Disqualified) {
            return Err(TournamentError::AlreadyDisqualified);
        }
        if reason == DropReason::Drop && self.rounds.is_empty() {
            self.players.remove(player_id);
            self.dropped.remove(player_id);
        } else {
            self.dropped.insert(player_id.to_string(), reason);
            if let Some(player) = self.players.get_mut(player_id) {
                player.playing = false;
            }
        }
        Ok(())
    }

    /// Open the check-in window for the next round.
    pub fn open_checkin(&mut self) -> TournamentResult<()> {
        if self.config.staggered {
            return Err(TournamentError::NoStaggeredCheckin);
        }
        if self.state == TournamentState::Playing {
            return Err(TournamentError::RoundInProgress);
        }
        if !matches!(
            self.state,
            TournamentState::Checkin | TournamentState::WaitingForStart
        ) {
            // coming from REGISTRATION or WAITING_FOR_CHECKIN: a fresh window
            self.reset_checkin();
        }
        self.state = TournamentState::Checkin;
        Ok(())
    }

    /// Close the check-in window. A no-op outside of CHECKIN.
    pub fn close_checkin(&mut self) {
        if self.state == TournamentState::Checkin {
            self.state = TournamentState::WaitingForStart;
        }
    }

    /// Start the next round, delegating seating optimization for rounds
    /// after the first. Returns the 1-based round number.
    pub async fn start_round<R: Rng + ?Sized>(
        &mut self,
        optimizer: &dyn SeatingOptimizer,
        progress: ProgressFn,
        rng: &mut R,
    ) -> TournamentResult<usize> {
        match self.state {
            TournamentState::Registration => return Err(TournamentError::CheckinRequired),
            TournamentState::Playing => return Err(TournamentError::PreviousRoundUnfinished),
            TournamentState::Finished => return Err(TournamentError::TournamentFinished),
            _ => {}
        }
        if self.config.staggered {
            // the schedule was fixed up front, re-activate its next round
            let round = self.rounds.get(self.current_round).ok_or_else(|| {
                log::error!("{}: staggered schedule exhausted", self.name);
                TournamentError::Internal("staggered schedule exhausted".into())
            })?;
            let seated: Vec<PlayerId> = round.seating.players().cloned().collect();
            for player in self.players.values_mut() {
                player.playing = seated.contains(&player.id);
            }
            self.current_round += 1;
            self.state = TournamentState::Playing;
            return Ok(self.current_round);
        }
        let eligible: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.playing)
            .map(|p| p.id.clone())
            .collect();
        if eligible.len() < 4 {
            return Err(TournamentError::NotEnoughPlayers);
        }
        if matches!(eligible.len(), 6 | 7 | 11) {
            return Err(TournamentError::StaggeredStructureRequired);
        }
        let mut seating = RoundSeating::from_players(eligible)?;
        seating.shuffle(rng);
        self.rounds.push(Round {
            seating,
            ..Round::default()
        });
        self.current_round += 1;
        self.state = TournamentState::Playing;
        if self.current_round > 1 {
            let seatings: Vec<RoundSeating> =
                self.rounds.iter().map(|r| r.seating.clone()).collect();
            let (mut optimized, score) = optimizer
                .optimize(
                    seatings,
                    self.current_round - 1,
                    DEFAULT_ITERATIONS,
                    progress,
                )
                .await?;
            log::info!(
                "{}: optimized seating for round {} with score {}",
                self.name,
                self.current_round,
                score
            );
            if let Some(seating) = optimized.pop() {
                if let Some(round) = self.rounds.last_mut() {
                    round.seating = seating;
                }
            }
        }
        Ok(self.current_round)
    }

    /// Turn the tournament into a staggered one.
    ///
    /// For 6, 7 or 11 players only: more rounds get scheduled, with players
    /// sitting some out, so that everyone plays `rounds_per_player` rounds.
    pub async fn make_staggered(
        &mut self,
        rounds_per_player: usize,
        optimizer: &dyn SeatingOptimizer,
        progress: ProgressFn,
    ) -> TournamentResult<()> {
        if self.config.staggered {
            return Ok(());
        }
        if self.config.register_between {
            return Err(TournamentError::StaggeredRegisterBetween);
        }
        if !self.rounds.is_empty() {
            return Err(TournamentError::TooLateToStagger);
        }
        let eligible: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.playing)
            .map(|p| p.id.clone())
            .collect();
        if !matches!(eligible.len(), 6 | 7 | 11) {
            return Err(TournamentError::StaggeredPlayerCount);
        }
        let schedule = optimizer
            .staggered_rounds(eligible, rounds_per_player)
            .await?;
        let (optimized, score) = optimizer
            .optimize(schedule, 0, DEFAULT_ITERATIONS, progress)
            .await?;
        log::info!(
            "{}: optimized staggered seating for {} rounds with score {}",
            self.name,
            rounds_per_player,
            score
        );
        self.rounds = optimized
            .into_iter()
            .map(|seating| Round {
                seating,
                ..Round::default()
            })
            .collect();
        self.config.staggered = true;
        self.state = TournamentState::WaitingForStart;
        Ok(())
    }

    /// Revert a staggered structure, before any round has started.
    pub fn unmake_staggered(&mut self) -> TournamentResult<()> {
        if !self.config.staggered {
            return Ok(());
        }
        if self.current_round > 0 {
            return Err(TournamentError::StructureFrozen);
        }
        self.rounds.clear();
        self.config.staggered = false;
        Ok(())
    }

    /// Seat a late-coming player at a 4-player table of the current round.
    pub fn round_add(
        &mut self,
        player_id: &str,
        table_num: usize,
        optimizer: &dyn SeatingOptimizer,
    ) -> TournamentResult<()> {
        if self.config.staggered {
            return Err(TournamentError::StaggeredSeatingFixed);
        }
        self.check_player(player_id)?;
        let round = self.rounds.last().ok_or(TournamentError::NoRound)?;
        let table = round
            .seating
            .table(table_num)
            .ok_or(TournamentError::InvalidTableNumber)?;
        if table.len() > 4 {
            return Err(TournamentError::TableFull);
        }
        if self.max_rounds > 0 && self.player_rounds_played(player_id) >= self.max_rounds {
            return Err(TournamentError::MaxRoundsReached);
        }
        if let Some(round) = self.rounds.last_mut() {
            round.seating.add_to_table(table_num, player_id.to_string());
        }
        if let Some(player) = self.players.get_mut(player_id) {
            player.playing = true;
        }
        self.reoptimize_table(table_num, optimizer);
        Ok(())
    }

    /// Unseat a player from a 5-player table of the current round.
    /// Returns the 1-based table number they left.
    pub fn round_remove(
        &mut self,
        player_id: &str,
        optimizer: &dyn SeatingOptimizer,
    ) -> TournamentResult<usize> {
        if self.config.staggered {
            return Err(TournamentError::StaggeredSeatingFixed);
        }
        self.check_player(player_id)?;
        let round = self.rounds.last().ok_or(TournamentError::NoRound)?;
        let (table_num, _, size) = round
            .seating
            .position_of(player_id)
            .ok_or(TournamentError::PlayerNotSeated)?;
        if size < 5 {
            return Err(TournamentError::TableAtMinimum);
        }
        if let Some(round) = self.rounds.last_mut() {
            round.seating.remove_player(player_id);
        }
        if let Some(player) = self.players.get_mut(player_id) {
            player.playing = false;
        }
        self.reoptimize_table(table_num, optimizer);
        Ok(table_num)
    }

    /// Mark the current round as finished; its score gets frozen.
    ///
    /// Requires every table's score to be correct, otherwise fails naming
    /// the incorrect tables. On the finals round, computes the winner and
    /// finishes the tournament.
    pub fn finish_round(&mut self, keep_checkin: bool) -> TournamentResult<()> {
        if self.rounds.is_empty() || self.state != TournamentState::Playing {
            return Err(TournamentError::NoRound);
        }
        let finals = {
            let round = self.rounds.last_mut().ok_or(TournamentError::NoRound)?;
            let incorrect = round.score();
            if !incorrect.is_empty() {
                return Err(TournamentError::IncorrectScore {
                    round: self.current_round,
                    tables: incorrect,
                });
            }
            round.finals
        };
        if finals {
            self.state = TournamentState::Finished;
            self.reset_checkin();
            self.standings()?; // computes and records the winner
        } else {
            self.state = TournamentState::WaitingForStart;
            if self.config.checkin_each_round && !keep_checkin {
                self.reset_checkin();
                self.state = TournamentState::WaitingForCheckin;
            } else if self.max_rounds > 0 {
                let expired: Vec<PlayerId> = self
                    .players
                    .keys()
                    .filter(|id| self.player_rounds_played(id) >= self.max_rounds)
                    .cloned()
                    .collect();
                for id in expired {
                    if let Some(player) = self.players.get_mut(&id) {
                        player.playing = false;
                    }
                }
            }
        }
        Ok(())
    }

    /// Discard the current round so it can be started anew. Only possible
    /// while no result has been recorded.
    pub fn reset_round(&mut self) -> TournamentResult<()> {
        if self.rounds.is_empty() {
            return Err(TournamentError::NoRound);
        }
        if !self.rounds.last().is_some_and(|r| r.results.is_empty()) {
            return Err(TournamentError::RoundHasResults);
        }
        let round = self.rounds.pop().ok_or(TournamentError::NoRound)?;
        self.current_round -= 1;
        self.state = if round.finals {
            TournamentState::WaitingForStart
        } else {
            TournamentState::Checkin
        };
        Ok(())
    }

    /// Undo the most recent, not-yet-played round entirely.
    pub fn rollback_round(&mut self) -> TournamentResult<()> {
        if self.rounds.is_empty() {
            return Err(TournamentError::NoRound);
        }
        if !self.rounds.last().is_some_and(|r| r.results.is_empty()) {
            return Err(TournamentError::RoundHasResults);
        }
        self.rounds.pop();
        self.current_round -= 1;
        self.state = TournamentState::WaitingForStart;
        Ok(())
    }

    /// Seed and start the finals round.
    ///
    /// Standings are computed with a toss, the top 5 get their seed order
    /// frozen (so a toss winner keeps their seat across reseatings), and a
    /// synthetic finals round starts immediately.
    pub fn start_finals<R: Rng>(&mut self, rng: &mut R) -> TournamentResult<usize> {
        let (_, ranking) = self.standings_with_toss(rng)?;
        let finalists: Vec<PlayerId> = ranking
            .into_iter()
            .take(5)
            .map(|(_, id, _)| id)
            .collect();
        for player in self.players.values_mut() {
            player.seed = 0;
            player.playing = false;
        }
        for (index, id) in finalists.iter().enumerate() {
            if let Some(player) = self.players.get_mut(id) {
                player.seed = (index + 1) as u8;
                player.playing = true;
            }
        }
        // the finals "seating" records seeding order, the actual table
        // seating is decided at the table
        self.current_round += 1;
        self.rounds.push(Round {
            seating: RoundSeating::from_players(finalists)?,
            finals: true,
            ..Round::default()
        });
        self.state = TournamentState::Playing;
        Ok(self.current_round)
    }

    /// Report the VPs a player scored. Returns whether their table's score
    /// is now correct and complete.
    ///
    /// `round_number` defaults to the latest round.
    pub fn report(
        &mut self,
        player_id: &str,
        vp: f64,
        round_number: Option<usize>,
    ) -> TournamentResult<bool> {
        let round_number = self.check_round_number(round_number)?;
        self.check_player(player_id)?;
        if !self.rounds[round_number - 1].seating.contains(player_id) {
            return Err(TournamentError::PlayerNotSeated);
        }
        // disqualified players cannot enter VPs even for rounds they played
        if self.dropped.get(player_id) == Some(&DropReason::Disqualified) {
            return Err(TournamentError::DisqualifiedPlayer);
        }
        let vp = Vp::try_from_f64(vp).ok_or(TournamentError::InvalidVp)?;
        let round = &mut self.rounds[round_number - 1];
        round
            .results
            .insert(player_id.to_string(), Score::from_vp(vp));
        Ok(round.score_player(player_id).unwrap_or(false))
    }

    /// Accept an odd score situation on a table, as decided by a judge.
    ///
    /// Typically needed when a player drops or is disqualified and the
    /// expected VPs are not, or only partially, attributed.
    pub fn validate_score(
        &mut self,
        table_num: usize,
        judge: &str,
        comment: &str,
        round_number: Option<usize>,
    ) -> TournamentResult<()> {
        let round_number = self.check_round_number(round_number)?;
        let round = &mut self.rounds[round_number - 1];
        if table_num < 1 || table_num > round.seating.tables_count() {
            return Err(TournamentError::InvalidTableNumber);
        }
        round.overrides.insert(
            table_num,
            Note {
                judge: judge.to_string(),
                level: NoteLevel::Override,
                text: comment.to_string(),
            },
        );
        Ok(())
    }

    /// Record a judge note concerning a player.
    ///
    /// Repeated cautions should lead to a warning, repeated warnings to a
    /// disqualification (cf. [`Tournament::drop_player`]).
    pub fn note(
        &mut self,
        player_id: &str,
        judge: &str,
        level: NoteLevel,
        comment: &str,
    ) -> TournamentResult<()> {
        self.check_player(player_id)?;
        self.notes.entry(player_id.to_string()).or_default().push(Note {
            judge: judge.to_string(),
            level,
            text: comment.to_string(),
        });
        Ok(())
    }

    pub fn player_status(&self, player_id: &str) -> PlayerStatus {
        let Some(player) = self.players.get(player_id) else {
            return PlayerStatus::NotRegistered;
        };
        match self.dropped.get(player_id) {
            Some(DropReason::Drop) => return PlayerStatus::DroppedOut,
            Some(DropReason::Disqualified) => return PlayerStatus::Disqualified,
            None => {}
        }
        if self.config.decklist_required && !player.has_deck() {
            return PlayerStatus::MissingDeck;
        }
        match self.state {
            TournamentState::Registration
            | TournamentState::WaitingForCheckin
            | TournamentState::Finished => PlayerStatus::Waiting,
            TournamentState::Checkin => {
                if player.playing {
                    PlayerStatus::CheckedIn
                } else {
                    PlayerStatus::CheckinRequired
                }
            }
            TournamentState::WaitingForStart => {
                if player.playing {
                    PlayerStatus::CheckedIn
                } else {
                    PlayerStatus::CheckedOut
                }
            }
            TournamentState::Playing => {
                if player.playing {
                    PlayerStatus::Playing
                } else {
                    PlayerStatus::CheckedOut
                }
            }
        }
    }

    /// Rounds whose seating includes the player, the finals included.
    pub fn player_rounds_played(&self, player_id: &str) -> usize {
        self.rounds
            .iter()
            .filter(|round| round.seating.contains(player_id))
            .count()
    }

    /// The player's total score across all rounds.
    pub fn player_score(&self, player_id: &str) -> Score {
        let mut total = Score::default();
        for round in &self.rounds {
            if let Some(score) = round.results.get(player_id) {
                total += *score;
            }
        }
        total
    }

    /// Comprehensive player information for display.
    pub fn player_info(&self, player_id: &str) -> TournamentResult<PlayerInfo> {
        let player = self.check_player(player_id)?.clone();
        let seat = self
            .rounds
            .last()
            .and_then(|round| round.seating.position_of(player_id));
        Ok(PlayerInfo {
            status: self.player_status(player_id),
            rounds: self.player_rounds_played(player_id),
            score: self.player_score(player_id),
            notes: self.notes.get(player_id).cloned().unwrap_or_default(),
            table: seat.map(|(table, _, _)| table),
            position: seat.map(|(_, position, _)| position),
            player,
        })
    }

    /// Number of tables in a round (defaults to the latest).
    pub fn tables_count(&self, round_number: Option<usize>) -> TournamentResult<usize> {
        let round_number = self.check_round_number(round_number)?;
        Ok(self.rounds[round_number - 1].seating.tables_count())
    }

    fn check_player(&self, player_id: &str) -> TournamentResult<&Player> {
        self.players
            .get(player_id)
            .ok_or(TournamentError::PlayerNotRegistered)
    }

    fn check_round_number(&self, round_number: Option<usize>) -> TournamentResult<usize> {
        match round_number {
            None => {
                if self.rounds.is_empty() {
                    Err(TournamentError::NoRound)
                } else {
                    Ok(self.rounds.len())
                }
            }
            Some(0) => Err(TournamentError::InvalidRoundNumber(0)),
            Some(n) if n > self.rounds.len() => Err(TournamentError::RoundNotPlayed(n)),
            Some(n) => Ok(n),
        }
    }

    pub(crate) fn reset_checkin(&mut self) {
        for player in self.players.values_mut() {
            player.playing = false;
        }
    }

    /// After a manual seat change, re-optimize the table's seat order when
    /// there is seating history to respect.
    fn reoptimize_table(&mut self, table_num: usize, optimizer: &dyn SeatingOptimizer) {
        if self.rounds.len() > 1 {
            let mut seatings: Vec<RoundSeating> =
                self.rounds.iter().map(|r| r.seating.clone()).collect();
            optimizer.optimize_table(&mut seatings, table_num - 1);
            if let (Some(round), Some(seating)) = (self.rounds.last_mut(), seatings.pop()) {
                round.seating = seating;
            }
        }
    }
}
