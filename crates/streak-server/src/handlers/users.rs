//! Handler for `POST /users` (sign-up). The only unauthenticated route.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use streak_core::{
  store::{StoreError, StoreErrorKind, StreakStore},
  user::{NewUser, UserSettings},
};
use uuid::Uuid;

use crate::{AppState, auth::hash_password, error::Error};

fn default_allow_tracking() -> bool { true }

#[derive(Debug, Deserialize)]
pub struct SignUpBody {
  pub email:          String,
  pub password:       String,
  #[serde(default = "default_allow_tracking")]
  pub allow_tracking: bool,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
  pub user_id: Uuid,
}

/// `POST /users`, body: `{"email":"…","password":"…","allow_tracking":true}`
pub async fn sign_up<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignUpBody>,
) -> Result<(StatusCode, Json<SignUpResponse>), Error>
where
  S: StreakStore + Clone + Send + Sync + 'static,
{
  let email = body.email.trim().to_owned();
  if email.is_empty() || !email.contains('@') {
    return Err(Error::BadRequest("email must be a valid address".into()));
  }
  if body.password.is_empty() {
    return Err(Error::BadRequest("password must not be empty".into()));
  }
  // `:` would make the Basic credentials ambiguous.
  if email.contains(':') {
    return Err(Error::BadRequest("email must not contain ':'".into()));
  }

  let password_hash = hash_password(&body.password, state.password_params.clone())?;

  let user = state
    .store
    .create_user(NewUser {
      email,
      password_hash,
      settings: UserSettings {
        allow_tracking: body.allow_tracking,
        streak_id:      state.claims.catalog().default_streak_id().to_owned(),
      },
    })
    .await
    .map_err(|e| match e.kind() {
      StoreErrorKind::DuplicateEmail => Error::EmailTaken,
      _ => Error::store(e),
    })?;

  tracing::info!(user_id = %user.user_id, streak_id = %user.settings.streak_id, "user registered");
  Ok((StatusCode::CREATED, Json(SignUpResponse { user_id: user.user_id })))
}
