// League persistence seam: versioned reads and compare-and-swap writes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::league::{League, LeagueId, LeagueStatus};

/// A league snapshot paired with the store version it was read at. Writers
/// hand the version back so the store can reject lost updates.
#[derive(Debug, Clone)]
pub struct VersionedLeague {
    pub league: League,
    pub version: u64,
}

/// Storage abstraction for leagues.
///
/// The engine performs each pick as load -> validate -> mutate -> `update`
/// with the loaded version; implementations must apply the write atomically
/// and reject it if the stored version no longer matches, so a pick either
/// lands in full or not at all.
#[async_trait]
pub trait LeagueStore: Send + Sync {
    /// Fetch one league with its current version.
    async fn get(&self, id: &LeagueId) -> Result<VersionedLeague, StoreError>;

    /// All leagues currently drafting with a live turn clock. The sweeper's
    /// query; the result is a snapshot and may be stale by the time it is
    /// acted on.
    async fn list_drafting(&self) -> Vec<VersionedLeague>;

    /// Insert or replace a league unconditionally (setup-time only).
    async fn put(&self, league: League);

    /// Conditionally replace a league. Fails with
    /// [`StoreError::VersionConflict`] if the stored version differs from
    /// `expected_version`.
    async fn update(&self, league: League, expected_version: u64) -> Result<(), StoreError>;
}

/// In-memory store for a single-process deployment. A swap to a real
/// database only has to honor the same compare-and-swap contract.
#[derive(Default)]
pub struct MemoryStore {
    leagues: RwLock<HashMap<LeagueId, VersionedLeague>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl LeagueStore for MemoryStore {
    async fn get(&self, id: &LeagueId) -> Result<VersionedLeague, StoreError> {
        self.leagues
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn list_drafting(&self) -> Vec<VersionedLeague> {
        self.leagues
            .read()
            .await
            .values()
            .filter(|v| {
                v.league.status == LeagueStatus::Drafting && v.league.draft_state.is_active
            })
            .cloned()
            .collect()
    }

    async fn put(&self, league: League) {
        let mut leagues = self.leagues.write().await;
        let version = leagues.get(&league.id).map(|v| v.version + 1).unwrap_or(1);
        leagues.insert(league.id.clone(), VersionedLeague { league, version });
    }

    async fn update(&self, league: League, expected_version: u64) -> Result<(), StoreError> {
        let mut leagues = self.leagues.write().await;
        let current = leagues
            .get(&league.id)
            .ok_or_else(|| StoreError::NotFound(league.id.clone()))?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: league.id.clone(),
                expected: expected_version,
                found: current.version,
            });
        }
        leagues.insert(
            league.id.clone(),
            VersionedLeague {
                league,
                version: expected_version + 1,
            },
        );
        Ok(())
    }
}
