//! Streak definitions and the validated catalog they are served from.
//!
//! Configuration is validated once, when the catalog is built. The evaluator
//! assumes every [`StreakConfig`] it receives has already passed
//! [`StreakConfig::validate`].

use std::collections::HashMap;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── StreakConfig ────────────────────────────────────────────────────────────

/// Upper bound on either duration, about 31 700 years. Keeps the sum of both
/// in range as whole microseconds.
const MAX_SECONDS: f64 = 1e12;

/// Whole microseconds, so window arithmetic is exact.
fn to_delta(seconds: f64) -> TimeDelta {
  TimeDelta::microseconds((seconds * 1_000_000.0).round() as i64)
}

fn in_range(seconds: f64) -> bool {
  seconds.is_finite() && (0.0..=MAX_SECONDS).contains(&seconds)
}

/// The rules for a single named streak. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakConfig {
  /// Minimum time that must elapse between consecutive accepted claims.
  pub claim_interval_seconds: f64,
  /// Grace window after the claim interval during which a late claim still
  /// continues the streak.
  pub backoff_seconds:        f64,
  /// Serial number at which the reward starts being granted.
  pub min_interactions:       u32,
  pub reward_id:              String,
}

impl StreakConfig {
  /// Check the invariants the evaluator relies on.
  pub fn validate(&self, streak_id: &str) -> Result<()> {
    if !in_range(self.claim_interval_seconds) {
      return Err(Error::InvalidClaimInterval {
        streak_id: streak_id.to_owned(),
        value:     self.claim_interval_seconds,
      });
    }
    if !in_range(self.backoff_seconds) {
      return Err(Error::InvalidBackoff {
        streak_id: streak_id.to_owned(),
        value:     self.backoff_seconds,
      });
    }
    if self.min_interactions < 1 {
      return Err(Error::InvalidMinInteractions(streak_id.to_owned()));
    }
    if self.reward_id.trim().is_empty() {
      return Err(Error::EmptyRewardId(streak_id.to_owned()));
    }
    Ok(())
  }

  /// Minimum spacing between accepted claims.
  pub fn claim_interval(&self) -> TimeDelta { to_delta(self.claim_interval_seconds) }

  /// Latest elapsed time that still continues the streak. Each part is
  /// rounded to whole microseconds before they are added.
  pub fn restart_after(&self) -> TimeDelta {
    self.claim_interval() + to_delta(self.backoff_seconds)
  }
}

// ─── StreakCatalog ───────────────────────────────────────────────────────────

/// All configured streaks, keyed by `streak_id`, plus the one assigned to new
/// users.
#[derive(Debug, Clone)]
pub struct StreakCatalog {
  default_streak: String,
  streaks:        HashMap<String, StreakConfig>,
}

impl StreakCatalog {
  /// Build a catalog, validating every definition.
  ///
  /// Any failure here is a fatal configuration error; callers are expected
  /// to refuse to start.
  pub fn new(
    default_streak: impl Into<String>,
    streaks: HashMap<String, StreakConfig>,
  ) -> Result<Self> {
    let default_streak = default_streak.into();

    if streaks.is_empty() {
      return Err(Error::NoStreaks);
    }
    for (streak_id, config) in &streaks {
      config.validate(streak_id)?;
    }
    if !streaks.contains_key(&default_streak) {
      return Err(Error::UnknownDefaultStreak(default_streak));
    }

    Ok(Self { default_streak, streaks })
  }

  /// A catalog holding exactly one streak, which is also the default.
  pub fn single(streak_id: impl Into<String>, config: StreakConfig) -> Result<Self> {
    let streak_id = streak_id.into();
    Self::new(streak_id.clone(), HashMap::from([(streak_id, config)]))
  }

  pub fn default_streak_id(&self) -> &str { &self.default_streak }

  pub fn get(&self, streak_id: &str) -> Option<&StreakConfig> {
    self.streaks.get(streak_id)
  }

  pub fn len(&self) -> usize { self.streaks.len() }

  pub fn is_empty(&self) -> bool { self.streaks.is_empty() }
}
