//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use streak_core::{claim::ClaimError, store::StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("User with this email already exists")]
  EmailTaken,

  #[error("Tracking should be enabled to perform interaction")]
  TrackingDisabled,

  #[error("Not enough time elapsed since last interaction")]
  TooSoon { retry_after_secs: u64 },

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Error::Store(Box::new(e))
  }
}

impl<E: StoreError> From<ClaimError<E>> for Error {
  fn from(e: ClaimError<E>) -> Self {
    match e {
      ClaimError::TrackingDisabled => Error::TrackingDisabled,
      ClaimError::TooSoon(too_soon) => Error::TooSoon {
        retry_after_secs: too_soon.retry_after_secs(),
      },
      // Authenticated a moment ago, gone now.
      ClaimError::UserNotFound(_) => Error::Unauthorized,
      ClaimError::UnknownStreak(id) => {
        Error::Internal(format!("streak {id:?} is not configured"))
      }
      ClaimError::Store(e) => Error::store(e),
    }
  }
}

fn body(status: StatusCode, message: String) -> Response {
  (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let message = self.to_string();
    match self {
      Error::Unauthorized => {
        let mut res = body(StatusCode::UNAUTHORIZED, message);
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"streak\""),
        );
        res
      }
      Error::BadRequest(_) | Error::TrackingDisabled => {
        body(StatusCode::BAD_REQUEST, message)
      }
      Error::EmailTaken => body(StatusCode::CONFLICT, message),
      Error::TooSoon { retry_after_secs } => {
        let mut res = body(StatusCode::BAD_REQUEST, message);
        res
          .headers_mut()
          .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        res
      }
      Error::Internal(_) | Error::Store(_) => {
        tracing::error!(error = %message, "request failed");
        body(StatusCode::INTERNAL_SERVER_ERROR, message)
      }
    }
  }
}
