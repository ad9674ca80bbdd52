//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::services::expo::ExpoClient;
use crate::services::loyalty::TierCache;
use crate::services::stripe::StripeClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tiers: TierCache,
    stripe: Option<StripeClient>,
    expo: ExpoClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The payment client is only built when `STRIPE_SECRET_KEY` is set.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let stripe = config.stripe.as_ref().map(StripeClient::new);
        let expo = ExpoClient::new(config.expo_access_token.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tiers: TierCache::new(),
                stripe,
                expo,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the cached loyalty tier ladder.
    #[must_use]
    pub fn tiers(&self) -> &TierCache {
        &self.inner.tiers
    }

    /// Get the payment gateway client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotConfigured` when no secret key is configured.
    pub fn stripe(&self) -> Result<&StripeClient, AppError> {
        self.inner
            .stripe
            .as_ref()
            .ok_or(AppError::NotConfigured("Stripe"))
    }

    /// Get the push notification client.
    #[must_use]
    pub fn expo(&self) -> &ExpoClient {
        &self.inner.expo
    }
}
