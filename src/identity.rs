//! Player identity verification service contract.
//!
//! Sanctioned tournaments require a VEKN ID#; the registry lookup that
//! resolves an ID to a player name is an external service. Lookup failures
//! are validation errors; service unavailability is surfaced separately so
//! callers can tell "wrong ID" from "try again later".

use async_trait::async_trait;
use thiserror::Error;

/// Identity verification errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("VEKN ID# not found")]
    NotFound,

    #[error("Incomplete VEKN ID#")]
    Ambiguous,

    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}

/// External player identity registry.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolve a player identifier to the player's full name.
    async fn resolve(&self, player_id: &str) -> Result<String, IdentityError>;
}
