//! Tier lookups and visit bookkeeping.
//!
//! The tier ladder changes rarely, so it is cached in memory for five
//! minutes instead of being read on every sale.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use dengo_core::UserId;
use dengo_core::loyalty::{TierThreshold, next_tier};

use crate::db::RepositoryError;
use crate::db::tiers::TierRepository;
use crate::db::users;
use crate::models::user::LoyaltyState;

/// Cached copy of the `niveles_cuenta` thresholds.
#[derive(Clone)]
pub struct TierCache {
    cache: Cache<(), Arc<[TierThreshold]>>,
}

impl std::fmt::Debug for TierCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl Default for TierCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TierCache {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { cache }
    }

    /// Current thresholds, loading them on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the tiers cannot be loaded.
    pub async fn thresholds(&self, pool: &PgPool) -> Result<Arc<[TierThreshold]>, RepositoryError> {
        if let Some(cached) = self.cache.get(&()).await {
            return Ok(cached);
        }

        let thresholds: Arc<[TierThreshold]> = TierRepository::new(pool)
            .list()
            .await?
            .into_iter()
            .map(|tier| TierThreshold {
                id: tier.id,
                visitas_minimas: tier.visitas_minimas,
            })
            .collect();
        debug!(count = thresholds.len(), "Loaded tier thresholds");

        self.cache.insert((), Arc::clone(&thresholds)).await;
        Ok(thresholds)
    }
}

/// Credit `points`, count a visit, and promote the user when the new visit
/// count unlocks a higher tier.
///
/// Returns `None` when the user does not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an update fails.
#[instrument(skip(conn, tiers))]
pub async fn apply_visit(
    conn: &mut PgConnection,
    user: UserId,
    points: i32,
    tiers: &[TierThreshold],
) -> Result<Option<LoyaltyState>, RepositoryError> {
    let Some(mut state) = users::record_visit(&mut *conn, user, points).await? else {
        return Ok(None);
    };

    if let Some(tier) = next_tier(state.nivel_id, state.visitas, tiers) {
        users::set_tier(conn, user, tier).await?;
        debug!(%tier, visitas = state.visitas, "User promoted");
        state.nivel_id = Some(tier);
    }

    Ok(Some(state))
}
