//! HTTP Basic-auth extractor and argon2 password helpers.
//!
//! Credentials are `email:password`. The extractor looks the email up in the
//! store and verifies the password against the stored PHC string on every
//! request; there is no session state.

use argon2::{
  Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;
use streak_core::store::StreakStore;
use uuid::Uuid;

use crate::{AppState, error::Error};

/// The authenticated caller. Present in a handler means the request carried
/// valid credentials.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Hash `password` into an argon2id PHC string.
pub fn hash_password(password: &str, params: Params) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Internal(format!("argon2 error: {e}")))
}

/// Check `password` against a stored PHC string.
pub fn verify_password(password: &str, phc: &str) -> Result<(), Error> {
  let parsed = PasswordHash::new(phc).map_err(|_| Error::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| Error::Unauthorized)
}

/// Decode `Authorization: Basic …` into `(email, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = String::from_utf8(decoded).map_err(|_| Error::Unauthorized)?;

  let (email, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;
  Ok((email.to_owned(), password.to_owned()))
}

impl<S> FromRequestParts<AppState<S>> for AuthUser
where
  S: StreakStore + Clone + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers)?;

    let creds = state
      .store
      .find_credentials(&email)
      .await
      .map_err(Error::store)?
      .ok_or(Error::Unauthorized)?;

    verify_password(&password, &creds.password_hash)?;
    Ok(AuthUser(creds.user_id))
  }
}
