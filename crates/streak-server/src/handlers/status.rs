//! Handler for `GET /status`.
//!
//! Everything here is advisory. A client may use `remaining_seconds` to
//! schedule its next claim, but `POST /interactions` re-evaluates against
//! the server clock regardless.

use axum::{Json, extract::State};
use serde::Serialize;
use streak_core::{claim::StreakStatus, store::StreakStore};

use crate::{AppState, auth::AuthUser, error::Error};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
  pub allow_tracking:             bool,
  pub streak_id:                  String,
  pub claim_interval_seconds:     f64,
  /// Milliseconds since the Unix epoch; `null` before the first claim.
  pub last_interaction_timestamp: Option<i64>,
  pub serial_number:              Option<u32>,
  pub remaining_seconds:          u64,
}

impl From<StreakStatus> for StatusResponse {
  fn from(status: StreakStatus) -> Self {
    let last = status.last_interaction.as_ref();
    Self {
      allow_tracking:             status.allow_tracking,
      claim_interval_seconds:     status.claim_interval_seconds,
      last_interaction_timestamp: last.map(|i| i.timestamp.timestamp_millis()),
      serial_number:              last.map(|i| i.serial_number),
      remaining_seconds:          status.remaining_seconds,
      streak_id:                  status.streak_id,
    }
  }
}

/// `GET /status`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  AuthUser(user_id): AuthUser,
) -> Result<Json<StatusResponse>, Error>
where
  S: StreakStore + Clone + Send + Sync + 'static,
{
  let status = state.claims.status(user_id).await?;
  Ok(Json(status.into()))
}
