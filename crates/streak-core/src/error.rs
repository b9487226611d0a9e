//! Error types for `streak-core`.
//!
//! Everything here is a configuration fault detected at load time. Per-claim
//! outcomes live in [`crate::claim::ClaimError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no streaks are configured")]
  NoStreaks,

  #[error("default streak {0:?} is not configured")]
  UnknownDefaultStreak(String),

  #[error(
    "streak {streak_id:?}: claim_interval_seconds must be between 0 and 1e12 \
     (got {value})"
  )]
  InvalidClaimInterval { streak_id: String, value: f64 },

  #[error(
    "streak {streak_id:?}: backoff_seconds must be between 0 and 1e12 (got {value})"
  )]
  InvalidBackoff { streak_id: String, value: f64 },

  #[error("streak {0:?}: min_interactions must be at least 1")]
  InvalidMinInteractions(String),

  #[error("streak {0:?}: reward_id must not be empty")]
  EmptyRewardId(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
