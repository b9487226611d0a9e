//! Error type for `streak-store-sqlite`.

use rusqlite::ErrorCode;
use streak_core::store::{StoreError, StoreErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value does not fit its domain type.
  #[error("corrupt row: {0}")]
  Decode(String),

  #[error("a user with email {0:?} already exists")]
  DuplicateEmail(String),
}

impl Error {
  fn sqlite(&self) -> Option<&rusqlite::Error> {
    match self {
      Error::Sqlite(e) => Some(e),
      Error::Database(tokio_rusqlite::Error::Rusqlite(e)) => Some(e),
      _ => None,
    }
  }
}

impl StoreError for Error {
  fn kind(&self) -> StoreErrorKind {
    if let Error::DuplicateEmail(_) = self {
      return StoreErrorKind::DuplicateEmail;
    }
    match self.sqlite().and_then(rusqlite::Error::sqlite_error_code) {
      Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
        StoreErrorKind::Conflict
      }
      _ => StoreErrorKind::Other,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
