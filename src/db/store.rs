//! Tournament persistence: whole-aggregate storage with advisory locking.
//!
//! Each tournament is one JSONB document keyed by (guild, category), with at
//! most one active tournament per key. Concurrent access goes through
//! PostgreSQL transaction-scoped advisory locks:
//!
//! - [`UpdateLevel::ReadOnly`] takes no lock and may serve a cached copy,
//! - [`UpdateLevel::Write`] takes a shared lock without waiting and fails
//!   fast with [`TournamentError::Contention`] so user-facing commands stay
//!   responsive,
//! - [`UpdateLevel::ExclusiveWrite`] waits for an exclusive lock, for the
//!   rare commands that must not fail (finishing a round, closing).
//!
//! A [`TournamentHandle`] keeps its transaction open until [`commit`]; if
//! dropped without committing, the transaction rolls back and no change is
//! persisted.
//!
//! [`commit`]: TournamentHandle::commit

use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;
use std::time::Duration;

use super::config::DatabaseConfig;
use crate::tournament::{Tournament, TournamentError, TournamentResult};

/// Recently used tournaments kept in memory for lock-free reads.
const CACHE_MAX: usize = 5;
const CACHE_KEEP: usize = 4;

/// Identifies where a tournament takes place: one active tournament at most
/// per (guild, category) pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TournamentKey {
    pub guild: String,
    pub category: String,
}

impl TournamentKey {
    pub fn new(guild: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            guild: guild.into(),
            category: category.into(),
        }
    }

    /// Advisory lock key: the first 8 bytes of a SHA-256 over the key parts,
    /// as a signed 64-bit integer. The NUL separator keeps ("ab", "c") and
    /// ("a", "bc") distinct.
    pub fn advisory_key(&self) -> i64 {
        let mut hasher = Sha256::new();
        hasher.update(self.guild.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.category.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        i64::from_be_bytes(bytes)
    }
}

/// Declared intent when opening a tournament.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateLevel {
    /// No lock, possibly cached data.
    ReadOnly,
    /// Shared lock, fails fast on contention.
    Write,
    /// Exclusive lock, waits out other writers.
    ExclusiveWrite,
}

/// Tournament storage coordinator.
///
/// Cheap to clone the pool behind; one store instance is shared across all
/// command handlers.
#[derive(Debug)]
pub struct TournamentStore {
    pool: PgPool,
    cache: Mutex<HashMap<TournamentKey, Tournament>>,
}

impl TournamentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Connect a new store from configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Check that the database connection is healthy.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create the storage schema if it does not exist yet.
    pub async fn init(&self) -> TournamentResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tournament (
                guild TEXT NOT NULL,
                category TEXT NOT NULL,
                active SMALLINT NOT NULL DEFAULT 1,
                data JSONB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS tournament_active_idx
             ON tournament (guild, category) WHERE active = 1",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Open the active tournament for a key with the given access level.
    ///
    /// Write levels hold a transaction with an advisory lock until the
    /// handle is committed or dropped.
    pub async fn open(
        &self,
        key: &TournamentKey,
        level: UpdateLevel,
    ) -> TournamentResult<TournamentHandle<'_>> {
        if level == UpdateLevel::ReadOnly {
            if let Some(tournament) = self.cached(key) {
                return Ok(TournamentHandle {
                    store: self,
                    key: key.clone(),
                    txn: None,
                    tournament,
                });
            }
            let tournament = self.load(key).await?;
            if !tournament.is_open() {
                return Err(TournamentError::NoTournament);
            }
            self.cache_put_if_absent(key.clone(), tournament.clone());
            return Ok(TournamentHandle {
                store: self,
                key: key.clone(),
                txn: None,
                tournament,
            });
        }
        let mut txn = self.pool.begin().await?;
        self.lock(&mut txn, key, level).await?;
        let tournament = self.load(key).await?;
        if !tournament.is_open() {
            return Err(TournamentError::NoTournament);
        }
        Ok(TournamentHandle {
            store: self,
            key: key.clone(),
            txn: Some(txn),
            tournament,
        })
    }

    /// Record a new active tournament. Fails if one is already active for
    /// this key.
    pub async fn create(&self, key: &TournamentKey, tournament: Tournament) -> TournamentResult<()> {
        let mut txn = self.pool.begin().await?;
        self.lock(&mut txn, key, UpdateLevel::ExclusiveWrite).await?;
        let existing = self.load(key).await?;
        if existing.is_open() {
            return Err(TournamentError::AlreadyInProgress);
        }
        let data = serde_json::to_value(&tournament)?;
        sqlx::query("INSERT INTO tournament (guild, category, active, data) VALUES ($1, $2, 1, $3)")
            .bind(&key.guild)
            .bind(&key.category)
            .bind(data)
            .execute(&mut *txn)
            .await?;
        self.cache_put(key.clone(), tournament);
        txn.commit().await?;
        Ok(())
    }

    /// Archive the active tournament. Its data stays in the table with
    /// `active = 0` for the record.
    pub async fn close(&self, key: &TournamentKey) -> TournamentResult<()> {
        let mut txn = self.pool.begin().await?;
        self.lock(&mut txn, key, UpdateLevel::ExclusiveWrite).await?;
        let result =
            sqlx::query("UPDATE tournament SET active = 0 WHERE active = 1 AND guild = $1 AND category = $2")
                .bind(&key.guild)
                .bind(&key.category)
                .execute(&mut *txn)
                .await?;
        if result.rows_affected() == 0 {
            return Err(TournamentError::NoTournament);
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(key);
        }
        txn.commit().await?;
        Ok(())
    }

    async fn lock(
        &self,
        txn: &mut Transaction<'static, Postgres>,
        key: &TournamentKey,
        level: UpdateLevel,
    ) -> TournamentResult<()> {
        let advisory = key.advisory_key();
        match level {
            UpdateLevel::ReadOnly => {}
            UpdateLevel::Write => {
                let (locked,): (bool,) =
                    sqlx::query_as("SELECT pg_try_advisory_xact_lock_shared($1)")
                        .bind(advisory)
                        .fetch_one(&mut **txn)
                        .await?;
                if !locked {
                    return Err(TournamentError::Contention);
                }
            }
            UpdateLevel::ExclusiveWrite => {
                sqlx::query("SELECT pg_advisory_xact_lock($1)")
                    .bind(advisory)
                    .execute(&mut **txn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn load(&self, key: &TournamentKey) -> TournamentResult<Tournament> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT data FROM tournament WHERE active = 1 AND guild = $1 AND category = $2")
                .bind(&key.guild)
                .bind(&key.category)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((data,)) => Ok(serde_json::from_value(data)?),
            None => Ok(Tournament::default()),
        }
    }

    fn cached(&self, key: &TournamentKey) -> Option<Tournament> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    /// Unconditional replace, for the write paths: the value being cached is
    /// at least as fresh as anything a concurrent task could hold.
    fn cache_put(&self, key: TournamentKey, tournament: Tournament) {
        let Ok(mut cache) = self.cache.lock() else {
            return;
        };
        cache.insert(key, tournament);
        prune_cache(&mut cache, &mut rand::rng());
    }

    /// Cache population from the read path. The read loaded its value
    /// outside of any lock, so by the time it lands here a concurrent
    /// write may have cached a fresher one: the check and the insert
    /// happen under a single lock acquisition, and an existing entry wins.
    fn cache_put_if_absent(&self, key: TournamentKey, tournament: Tournament) {
        let Ok(mut cache) = self.cache.lock() else {
            return;
        };
        cache_insert_if_absent(&mut cache, key, tournament);
        prune_cache(&mut cache, &mut rand::rng());
    }
}

fn cache_insert_if_absent(
    cache: &mut HashMap<TournamentKey, Tournament>,
    key: TournamentKey,
    tournament: Tournament,
) {
    cache.entry(key).or_insert(tournament);
}

/// Drop random entries once the cache outgrows [`CACHE_MAX`]. Eviction does
/// not need to be smart, only bounded: evicted tournaments reload from the
/// database on the next read.
fn prune_cache<R: rand::Rng>(cache: &mut HashMap<TournamentKey, Tournament>, rng: &mut R) {
    if cache.len() <= CACHE_MAX {
        return;
    }
    let mut keys: Vec<TournamentKey> = cache.keys().cloned().collect();
    keys.shuffle(rng);
    for key in keys.into_iter().skip(CACHE_KEEP) {
        cache.remove(&key);
    }
}

/// An opened tournament, dereferencing to [`Tournament`].
///
/// Mutations only persist through [`TournamentHandle::commit`]; dropping the
/// handle rolls the transaction back.
#[derive(Debug)]
pub struct TournamentHandle<'a> {
    store: &'a TournamentStore,
    key: TournamentKey,
    txn: Option<Transaction<'static, Postgres>>,
    tournament: Tournament,
}

impl TournamentHandle<'_> {
    /// Persist the tournament and release the lock.
    ///
    /// The cache is refreshed before the transaction commits, so a reader
    /// can never observe a cached state newer than the database.
    pub async fn commit(mut self) -> TournamentResult<()> {
        let Some(mut txn) = self.txn.take() else {
            log::error!("commit on a read-only handle for {:?}", self.key);
            return Err(TournamentError::Internal(
                "commit on a read-only tournament handle".into(),
            ));
        };
        let data = serde_json::to_value(&self.tournament)?;
        sqlx::query("UPDATE tournament SET data = $3 WHERE active = 1 AND guild = $1 AND category = $2")
            .bind(&self.key.guild)
            .bind(&self.key.category)
            .bind(data)
            .execute(&mut *txn)
            .await?;
        self.store
            .cache_put(self.key.clone(), self.tournament.clone());
        txn.commit().await?;
        Ok(())
    }
}

impl Deref for TournamentHandle<'_> {
    type Target = Tournament;

    fn deref(&self) -> &Tournament {
        &self.tournament
    }
}

impl DerefMut for TournamentHandle<'_> {
    fn deref_mut(&mut self) -> &mut Tournament {
        &mut self.tournament
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::TournamentState;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn open_tournament(name: &str) -> Tournament {
        Tournament {
            name: name.to_string(),
            ..Tournament::default()
        }
    }

    /// Store against the database named by `DATABASE_URL`, or `None` to
    /// skip when no database is around.
    async fn live_store() -> Option<TournamentStore> {
        let database_url = std::env::var("DATABASE_URL").ok()?;
        let config = DatabaseConfig {
            database_url,
            max_connections: 5,
            ..DatabaseConfig::default()
        };
        let store = TournamentStore::connect(&config)
            .await
            .expect("Failed to connect to database");
        store.init().await.expect("Failed to initialize schema");
        Some(store)
    }

    fn unique_key() -> TournamentKey {
        TournamentKey::new("test-guild", format!("category-{}", rand::rng().random::<u64>()))
    }

    #[test]
    fn test_advisory_key_is_stable() {
        let key = TournamentKey::new("guild", "category");
        assert_eq!(key.advisory_key(), key.advisory_key());
        assert_eq!(
            TournamentKey::new("guild", "category").advisory_key(),
            key.advisory_key()
        );
    }

    #[test]
    fn test_advisory_key_separates_parts() {
        // concatenation alone would collide
        let a = TournamentKey::new("ab", "c");
        let b = TournamentKey::new("a", "bc");
        assert_ne!(a.advisory_key(), b.advisory_key());
    }

    #[test]
    fn test_prune_cache_is_bounded() {
        let mut cache = HashMap::new();
        for i in 0..10 {
            cache.insert(
                TournamentKey::new("guild", format!("category{i}")),
                Tournament::default(),
            );
        }
        let mut rng = StdRng::seed_from_u64(7);
        prune_cache(&mut cache, &mut rng);
        assert_eq!(cache.len(), CACHE_KEEP);
    }

    #[test]
    fn test_prune_cache_leaves_small_caches_alone() {
        let mut cache = HashMap::new();
        for i in 0..CACHE_MAX {
            cache.insert(
                TournamentKey::new("guild", format!("category{i}")),
                Tournament::default(),
            );
        }
        let mut rng = StdRng::seed_from_u64(7);
        prune_cache(&mut cache, &mut rng);
        assert_eq!(cache.len(), CACHE_MAX);
    }

    #[test]
    fn test_read_cache_insert_never_overwrites_fresher_entry() {
        // a read loads outside the lock: by the time it caches, a write
        // may have put a fresher aggregate in, which must win
        let mut cache = HashMap::new();
        let key = TournamentKey::new("guild", "category");
        cache.insert(key.clone(), open_tournament("fresh"));
        cache_insert_if_absent(&mut cache, key.clone(), open_tournament("stale"));
        assert_eq!(cache[&key].name, "fresh");

        let other = TournamentKey::new("guild", "other");
        cache_insert_if_absent(&mut cache, other.clone(), open_tournament("loaded"));
        assert_eq!(cache[&other].name, "loaded");
    }

    #[tokio::test]
    async fn test_write_fails_fast_under_exclusive_lock() {
        let Some(store) = live_store().await else {
            return;
        };
        let key = unique_key();
        store
            .create(&key, open_tournament("locked out"))
            .await
            .unwrap();
        let exclusive = store.open(&key, UpdateLevel::ExclusiveWrite).await.unwrap();
        let err = store.open(&key, UpdateLevel::Write).await.unwrap_err();
        assert!(matches!(err, TournamentError::Contention));
        drop(exclusive);
        store.close(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_uncommitted_handle_rolls_back() {
        let Some(store) = live_store().await else {
            return;
        };
        let key = unique_key();
        store
            .create(&key, open_tournament("durable"))
            .await
            .unwrap();
        {
            let mut handle = store.open(&key, UpdateLevel::Write).await.unwrap();
            handle.open_checkin().unwrap();
            // dropped without commit: the transaction rolls back
        }
        let handle = store.open(&key, UpdateLevel::Write).await.unwrap();
        assert_eq!(handle.state, TournamentState::Registration);
        drop(handle);
        store.close(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_persists_changes() {
        let Some(store) = live_store().await else {
            return;
        };
        let key = unique_key();
        store
            .create(&key, open_tournament("persisted"))
            .await
            .unwrap();
        let mut handle = store.open(&key, UpdateLevel::Write).await.unwrap();
        handle.open_checkin().unwrap();
        handle.commit().await.unwrap();

        // fresh from the database, not the cache
        let handle = store.open(&key, UpdateLevel::Write).await.unwrap();
        assert_eq!(handle.state, TournamentState::Checkin);
        drop(handle);
        // and from the cache too
        let reader = store.open(&key, UpdateLevel::ReadOnly).await.unwrap();
        assert_eq!(reader.state, TournamentState::Checkin);
        store.close(&key).await.unwrap();

        let err = store.open(&key, UpdateLevel::Write).await.unwrap_err();
        assert!(matches!(err, TournamentError::NoTournament));
    }

    #[tokio::test]
    async fn test_create_rejects_second_active_tournament() {
        let Some(store) = live_store().await else {
            return;
        };
        let key = unique_key();
        store
            .create(&key, open_tournament("first"))
            .await
            .unwrap();
        let err = store
            .create(&key, open_tournament("second"))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::AlreadyInProgress));
        store.close(&key).await.unwrap();
    }
}
