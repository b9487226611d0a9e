//! The streak evaluator.
//!
//! [`evaluate`] is a pure function of the streak configuration, the most
//! recent accepted interaction and the current server time. It never touches
//! storage; persisting its result is the caller's job (see
//! [`crate::claim::ClaimService`]).
//!
//! With `elapsed` the time since the last accepted interaction:
//!
//! | `elapsed`                              | outcome                    |
//! |----------------------------------------|----------------------------|
//! | no previous interaction                | accept, serial 1           |
//! | `< interval`                           | reject, [`TooSoon`]        |
//! | `interval ..= interval + backoff`      | accept, serial `prev + 1`  |
//! | `> interval + backoff`                 | accept, serial 1 (restart) |
//!
//! Every accepted interaction whose serial number reaches `min_interactions`
//! grants the reward again; it is not a one-time unlock.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::{config::StreakConfig, interaction::Interaction};

/// The result of an accepted claim, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
  pub serial_number: u32,
  /// The instant the claim was accepted; becomes the interaction timestamp.
  pub timestamp:     DateTime<Utc>,
  /// `Some(reward_id)` when this claim earns a reward grant.
  pub grant_reward:  Option<String>,
}

/// The claim came before the cooldown expired. A normal outcome, not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("not enough time elapsed since last interaction")]
pub struct TooSoon {
  /// Seconds left until a claim would be accepted.
  pub remaining_seconds: f64,
}

impl TooSoon {
  /// Remaining cooldown rounded up to whole seconds, for `Retry-After`.
  pub fn retry_after_secs(&self) -> u64 { self.remaining_seconds.ceil().max(0.0) as u64 }
}

/// Decide whether a claim at `now` is accepted and what it yields.
pub fn evaluate(
  config: &StreakConfig,
  last: Option<&Interaction>,
  now: DateTime<Utc>,
) -> Result<Evaluation, TooSoon> {
  let serial_number = match last {
    None => 1,
    Some(prev) => {
      let elapsed = now - prev.timestamp;
      let interval = config.claim_interval();

      if elapsed < interval {
        return Err(TooSoon { remaining_seconds: as_seconds(interval - elapsed) });
      }

      // Exactly `interval + backoff` still continues the run.
      if elapsed > config.restart_after() {
        1
      } else {
        prev.serial_number.saturating_add(1)
      }
    }
  };

  let grant_reward =
    (serial_number >= config.min_interactions).then(|| config.reward_id.clone());

  Ok(Evaluation { serial_number, timestamp: now, grant_reward })
}

/// Seconds until a claim would be accepted; `0` when one would be now.
pub fn remaining_cooldown(
  config: &StreakConfig,
  last: Option<&Interaction>,
  now: DateTime<Utc>,
) -> f64 {
  match last {
    None => 0.0,
    Some(prev) => {
      let remaining = config.claim_interval() - (now - prev.timestamp);
      as_seconds(remaining.max(TimeDelta::zero()))
    }
  }
}

/// Fractional seconds, microsecond precision. Signed.
pub fn as_seconds(delta: TimeDelta) -> f64 {
  match delta.num_microseconds() {
    Some(micros) => micros as f64 / 1_000_000.0,
    None => delta.num_seconds() as f64,
  }
}
