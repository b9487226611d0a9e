//! Users and their per-user streak settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user settings consulted before every claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
  /// Claims are refused outright while this is `false`.
  pub allow_tracking: bool,
  /// The streak this user's claims count towards.
  pub streak_id:      String,
}

/// A registered user. The password hash is deliberately not part of this
/// type; see [`Credentials`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  pub email:      String,
  pub created_at: DateTime<Utc>,
  pub settings:   UserSettings,
}

/// Input to [`crate::store::StreakStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  /// PHC string, e.g. `$argon2id$v=19$…`.
  pub password_hash: String,
  pub settings:      UserSettings,
}

/// What the auth layer needs to verify a login.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user_id:       Uuid,
  pub password_hash: String,
}
