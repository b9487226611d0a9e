//! Handler for `GET /rewards`.

use std::collections::BTreeMap;

use axum::{Json, extract::State};
use streak_core::{
  reward::{RewardSummary, summarize},
  store::StreakStore,
};

use crate::{AppState, auth::AuthUser, error::Error};

/// `GET /rewards`: `{"<reward_id>": {"count", "title", "description", "image_url"}}`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AuthUser(user_id): AuthUser,
) -> Result<Json<BTreeMap<String, RewardSummary>>, Error>
where
  S: StreakStore + Clone + Send + Sync + 'static,
{
  let counts = state
    .store
    .reward_counts(user_id)
    .await
    .map_err(Error::store)?;
  Ok(Json(summarize(counts, &state.rewards)))
}
