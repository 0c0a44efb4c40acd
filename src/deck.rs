//! Decklist legality rules.
//!
//! Deck parsing is external: the validator service hands back a
//! [`DeckSummary`] with the counts the tournament rules care about, plus the
//! deck itself as an opaque JSON blob stored on the player. The legality
//! rules themselves live here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Deck legality errors, each naming the violated rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("Unable to read the decklist: {0}")]
    Unreadable(String),

    #[error("Too few library cards ({0} < 60)")]
    TooFewLibraryCards(usize),

    #[error("Too many library cards ({0} > 90)")]
    TooManyLibraryCards(usize),

    #[error("Too few crypt cards ({0} < 12)")]
    TooFewCryptCards(usize),

    #[error("Invalid grouping in crypt")]
    InvalidGrouping,

    #[error("Banned cards included: {0:?}")]
    BannedCards(Vec<String>),
}

/// What the external deck validator reports about a parsed deck.
///
/// `groups` excludes the "ANY" group, which matches every other group.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeckSummary {
    pub library_count: usize,
    pub crypt_count: usize,
    pub crypt_groups: BTreeSet<i32>,
    pub banned: Vec<String>,
    /// Opaque deck content, stored as-is on the player.
    pub deck: serde_json::Value,
}

impl DeckSummary {
    /// Check tournament legality: library size in [60, 90], crypt size >= 12,
    /// at most two adjacent crypt groups, no banned cards.
    pub fn check_legal(&self) -> Result<(), DeckError> {
        if self.library_count < 60 {
            return Err(DeckError::TooFewLibraryCards(self.library_count));
        }
        if self.library_count > 90 {
            return Err(DeckError::TooManyLibraryCards(self.library_count));
        }
        if self.crypt_count < 12 {
            return Err(DeckError::TooFewCryptCards(self.crypt_count));
        }
        if self.crypt_groups.len() > 2 {
            return Err(DeckError::InvalidGrouping);
        }
        if let (Some(min), Some(max)) = (
            self.crypt_groups.first().copied(),
            self.crypt_groups.last().copied(),
        ) {
            if max - min > 1 {
                return Err(DeckError::InvalidGrouping);
            }
        }
        if !self.banned.is_empty() {
            return Err(DeckError::BannedCards(self.banned.clone()));
        }
        Ok(())
    }
}

/// External deck parsing service, typically backed by a card database.
///
/// Accepts a decklist in any format the service understands (plain text,
/// an URL to a deck building site) and returns the parsed summary. Legality
/// is checked separately through [`DeckSummary::check_legal`].
#[async_trait]
pub trait DeckValidator: Send + Sync {
    async fn parse(&self, decklist: &str) -> Result<DeckSummary, DeckError>;
}
