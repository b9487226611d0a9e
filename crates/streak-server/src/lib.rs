//! HTTP layer for the streak tracker.
//!
//! Exposes an axum [`Router`] backed by any [`StreakStore`]. Every route
//! except sign-up requires HTTP Basic credentials; the authenticated user id
//! reaches handlers as an explicit [`auth::AuthUser`] argument.
//!
//! | Method | Path            | Notes |
//! |--------|-----------------|-------|
//! | `POST` | `/users`        | Sign up; body `{"email","password","allow_tracking"}` |
//! | `POST` | `/interactions` | Claim; no body |
//! | `GET`  | `/status`       | Current streak position and cooldown |
//! | `GET`  | `/rewards`      | Grant counts per reward, with catalog metadata |
//! | `PUT`  | `/settings`     | Body `{"allow_tracking": bool}` |

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use argon2::Params;
use axum::{
  Router,
  routing::{get, post, put},
};
use serde::Deserialize;
use streak_core::{
  claim::ClaimService,
  clock::Clock,
  config::{StreakCatalog, StreakConfig},
  reward::RewardInfo,
  store::StreakStore,
};
use tower_http::trace::TraceLayer;

use handlers::{interactions, rewards, settings, status, users};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  /// Streak assigned to newly registered users.
  pub default_streak: String,
  pub streaks:        HashMap<String, StreakConfig>,
  #[serde(default)]
  pub rewards:        HashMap<String, RewardInfo>,
}

impl ServerConfig {
  /// Validate the streak definitions into a catalog.
  pub fn catalog(&self) -> streak_core::Result<StreakCatalog> {
    StreakCatalog::new(self.default_streak.clone(), self.streaks.clone())
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: StreakStore> {
  pub store:           Arc<S>,
  pub claims:          ClaimService<S>,
  pub rewards:         Arc<HashMap<String, RewardInfo>>,
  /// Cost parameters for hashing new passwords. Verification always uses the
  /// parameters embedded in the stored hash.
  pub password_params: Params,
}

impl<S: StreakStore> AppState<S> {
  pub fn new(
    store: Arc<S>,
    catalog: StreakCatalog,
    rewards: HashMap<String, RewardInfo>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    let claims = ClaimService::new(Arc::clone(&store), Arc::new(catalog), clock);
    Self {
      store,
      claims,
      rewards: Arc::new(rewards),
      password_params: Params::default(),
    }
  }

  pub fn with_password_params(mut self, params: Params) -> Self {
    self.password_params = params;
    self
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the streak API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: StreakStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/users", post(users::sign_up::<S>))
    .route("/interactions", post(interactions::create::<S>))
    .route("/status", get(status::handler::<S>))
    .route("/rewards", get(rewards::list::<S>))
    .route("/settings", put(settings::update::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
