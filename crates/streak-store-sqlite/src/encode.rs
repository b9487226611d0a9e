//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed nine-digit
//! fraction, so lexical order is chronological order and no precision is
//! lost on the way back. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use streak_core::{
  interaction::Interaction,
  reward::RewardGrant,
  user::{User, UserSettings},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Serial number ────────────────────────────────────────────────────────────

pub fn decode_serial(n: i64) -> Result<u32> {
  u32::try_from(n)
    .ok()
    .filter(|&n| n >= 1)
    .ok_or_else(|| Error::Decode(format!("serial number out of range: {n}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `interactions` row.
pub struct RawInteraction {
  pub interaction_id: String,
  pub user_id:        String,
  pub streak_id:      String,
  pub timestamp:      String,
  pub serial_number:  i64,
}

impl RawInteraction {
  pub const COLUMNS: &'static str =
    "interaction_id, user_id, streak_id, timestamp, serial_number";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      interaction_id: row.get(0)?,
      user_id:        row.get(1)?,
      streak_id:      row.get(2)?,
      timestamp:      row.get(3)?,
      serial_number:  row.get(4)?,
    })
  }

  pub fn into_interaction(self) -> Result<Interaction> {
    Ok(Interaction {
      interaction_id: decode_uuid(&self.interaction_id)?,
      user_id:        decode_uuid(&self.user_id)?,
      streak_id:      self.streak_id,
      timestamp:      decode_dt(&self.timestamp)?,
      serial_number:  decode_serial(self.serial_number)?,
    })
  }
}

/// Raw values read directly from a `users` row (without the password hash).
pub struct RawUser {
  pub user_id:        String,
  pub email:          String,
  pub created_at:     String,
  pub allow_tracking: bool,
  pub streak_id:      String,
}

impl RawUser {
  pub const COLUMNS: &'static str =
    "user_id, email, created_at, allow_tracking, streak_id";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:        row.get(0)?,
      email:          row.get(1)?,
      created_at:     row.get(2)?,
      allow_tracking: row.get(3)?,
      streak_id:      row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      email:      self.email,
      created_at: decode_dt(&self.created_at)?,
      settings:   UserSettings {
        allow_tracking: self.allow_tracking,
        streak_id:      self.streak_id,
      },
    })
  }
}

/// Encoded column values for a new `reward_grants` row.
pub struct EncodedGrant {
  pub grant_id:   String,
  pub user_id:    String,
  pub reward_id:  String,
  pub created_at: String,
}

impl From<&RewardGrant> for EncodedGrant {
  fn from(g: &RewardGrant) -> Self {
    Self {
      grant_id:   encode_uuid(g.grant_id),
      user_id:    encode_uuid(g.user_id),
      reward_id:  g.reward_id.clone(),
      created_at: encode_dt(g.created_at),
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 9).unwrap();
    let b = a + chrono::TimeDelta::milliseconds(500);
    let c = a + chrono::TimeDelta::seconds(1);
    let mut encoded = vec![encode_dt(c), encode_dt(a), encode_dt(b)];
    encoded.sort();
    assert_eq!(encoded, vec![encode_dt(a), encode_dt(b), encode_dt(c)]);
  }

  #[test]
  fn timestamps_keep_sub_second_precision() {
    let dt = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    assert_eq!(decode_dt(&encode_dt(dt)).unwrap(), dt);
  }

  #[test]
  fn serial_must_be_positive() {
    assert_eq!(decode_serial(7).unwrap(), 7);
    assert!(matches!(decode_serial(0), Err(Error::Decode(_))));
    assert!(decode_serial(i64::MAX).is_err());
  }
}
