//! Handler for `PUT /settings`.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use streak_core::store::StreakStore;

use crate::{AppState, auth::AuthUser, error::Error};

#[derive(Debug, Deserialize, Serialize)]
pub struct SettingsBody {
  pub allow_tracking: bool,
}

/// `PUT /settings`, body: `{"allow_tracking": false}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  AuthUser(user_id): AuthUser,
  Json(body): Json<SettingsBody>,
) -> Result<Json<SettingsBody>, Error>
where
  S: StreakStore + Clone + Send + Sync + 'static,
{
  let settings = state
    .store
    .set_allow_tracking(user_id, body.allow_tracking)
    .await
    .map_err(Error::store)?
    .ok_or(Error::Unauthorized)?;

  tracing::info!(%user_id, allow_tracking = settings.allow_tracking, "tracking setting changed");
  Ok(Json(SettingsBody { allow_tracking: settings.allow_tracking }))
}
