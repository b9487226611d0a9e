//! Handler for `POST /interactions`.
//!
//! The request carries no body: the timestamp is always the server's clock.
//! Rejections surface as `400` with a JSON `{"error": …}` body; a cooldown
//! rejection also carries `Retry-After`.

use axum::{Json, extract::State};
use serde::Serialize;
use streak_core::{claim::Claim, store::StreakStore};

use crate::{AppState, auth::AuthUser, error::Error};

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
  /// Milliseconds since the Unix epoch.
  pub timestamp:     i64,
  pub reward_id:     Option<String>,
  pub serial_number: u32,
}

impl From<Claim> for InteractionResponse {
  fn from(claim: Claim) -> Self {
    Self {
      timestamp:     claim.interaction.timestamp.timestamp_millis(),
      reward_id:     claim.reward.map(|g| g.reward_id),
      serial_number: claim.interaction.serial_number,
    }
  }
}

/// `POST /interactions`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthUser(user_id): AuthUser,
) -> Result<Json<InteractionResponse>, Error>
where
  S: StreakStore + Clone + Send + Sync + 'static,
{
  let claim = state.claims.claim(user_id).await?;
  Ok(Json(claim.into()))
}
