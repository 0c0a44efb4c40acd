//! Database module: tournament persistence over PostgreSQL.
//!
//! Tournaments are stored as whole JSONB documents, one per (guild,
//! category), coordinated through advisory locks (see [`store`]). The
//! connection pool is built by [`TournamentStore::connect`] from a
//! [`DatabaseConfig`].

pub mod config;
pub mod store;

pub use config::DatabaseConfig;
pub use store::{TournamentHandle, TournamentKey, TournamentStore, UpdateLevel};
