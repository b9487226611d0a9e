//! The claim service, the one caller of [`evaluate`].
//!
//! A claim is a single unit of work against the store:
//!
//! 1. read the user's settings and refuse if tracking is off,
//! 2. read the most recent interaction for the user's streak,
//! 3. evaluate it against the server clock,
//! 4. append the interaction and, if earned, a reward grant.
//!
//! All four steps run inside [`StreakStore::transaction`], so two concurrent
//! claims for the same user cannot both pass the cooldown check or both extend
//! the streak from the same prior serial number.

use std::{future::Future, sync::Arc};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  clock::Clock,
  config::StreakCatalog,
  evaluator::{TooSoon, evaluate, remaining_cooldown},
  interaction::{Interaction, NewInteraction},
  reward::{NewRewardGrant, RewardGrant},
  store::{StoreError, StreakStore, StreakTx},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// A committed claim.
#[derive(Debug, Clone, Serialize)]
pub struct Claim {
  pub interaction: Interaction,
  /// Present when this claim earned a reward.
  pub reward:      Option<RewardGrant>,
}

impl Claim {
  pub fn reward_id(&self) -> Option<&str> {
    self.reward.as_ref().map(|g| g.reward_id.as_str())
  }
}

/// Why a claim did not produce an interaction.
///
/// [`ClaimError::TrackingDisabled`] and [`ClaimError::TooSoon`] are policy
/// rejections: expected, user-facing, and not faults.
#[derive(Debug, Error)]
pub enum ClaimError<E> {
  #[error("Tracking should be enabled to perform interaction")]
  TrackingDisabled,

  #[error("Not enough time elapsed since last interaction")]
  TooSoon(TooSoon),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  /// The user is assigned to a streak that is no longer configured.
  #[error("streak {0:?} is not configured")]
  UnknownStreak(String),

  #[error("store error: {0}")]
  Store(#[source] E),
}

impl<E> ClaimError<E> {
  pub fn is_rejection(&self) -> bool {
    matches!(self, Self::TrackingDisabled | Self::TooSoon(_))
  }
}

/// Read model for the "how is my streak doing" view.
#[derive(Debug, Clone, Serialize)]
pub struct StreakStatus {
  pub allow_tracking:         bool,
  pub streak_id:              String,
  pub claim_interval_seconds: f64,
  pub last_interaction:       Option<Interaction>,
  /// Whole seconds until the next claim would be accepted.
  pub remaining_seconds:      u64,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct ClaimService<S> {
  store:   Arc<S>,
  catalog: Arc<StreakCatalog>,
  clock:   Arc<dyn Clock>,
}

impl<S> Clone for ClaimService<S> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      catalog: Arc::clone(&self.catalog),
      clock:   Arc::clone(&self.clock),
    }
  }
}

impl<S: StreakStore> ClaimService<S> {
  pub fn new(store: Arc<S>, catalog: Arc<StreakCatalog>, clock: Arc<dyn Clock>) -> Self {
    Self { store, catalog, clock }
  }

  pub fn catalog(&self) -> &StreakCatalog { &self.catalog }

  /// Attempt a claim for `user_id` at the current server time.
  ///
  /// A lost race for the store's write lock is retried exactly once, with a
  /// fresh read of the prior state.
  ///
  /// Faults are only logged at `debug` here; the caller reports them.
  pub fn claim(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Claim, ClaimError<S::Error>>> + Send + '_ {
    async move {
      let outcome = match self.attempt(user_id).await {
        Err(ClaimError::Store(e)) if e.is_conflict() => {
          tracing::warn!(%user_id, error = %e, "claim lost write-lock race, retrying");
          self.attempt(user_id).await
        }
        other => other,
      };

      match &outcome {
        Ok(claim) => tracing::info!(
          %user_id,
          streak_id = %claim.interaction.streak_id,
          serial_number = claim.interaction.serial_number,
          reward_id = ?claim.reward_id(),
          "claim accepted"
        ),
        Err(e) if e.is_rejection() => {
          tracing::debug!(%user_id, reason = %e, "claim rejected")
        }
        Err(e) => tracing::debug!(%user_id, error = %e, "claim failed"),
      }

      outcome
    }
  }

  fn attempt(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Claim, ClaimError<S::Error>>> + Send + '_ {
    let catalog = Arc::clone(&self.catalog);
    let clock = Arc::clone(&self.clock);

    let unit_of_work = self
      .store
      .transaction(move |tx: &mut S::Tx<'_>| {
        let Some(settings) = tx.user_settings(user_id)? else {
          return Ok(Err(ClaimError::UserNotFound(user_id)));
        };
        if !settings.allow_tracking {
          return Ok(Err(ClaimError::TrackingDisabled));
        }
        let Some(config) = catalog.get(&settings.streak_id) else {
          return Ok(Err(ClaimError::UnknownStreak(settings.streak_id)));
        };

        let last = tx.last_interaction(user_id, &settings.streak_id)?;

        // The clock is read under the lock, after the prior state.
        let evaluation = match evaluate(config, last.as_ref(), clock.now()) {
          Ok(evaluation) => evaluation,
          Err(too_soon) => return Ok(Err(ClaimError::TooSoon(too_soon))),
        };

        let interaction = tx.append_interaction(NewInteraction {
          user_id,
          streak_id: settings.streak_id,
          timestamp: evaluation.timestamp,
          serial_number: evaluation.serial_number,
        })?;

        let reward = evaluation
          .grant_reward
          .map(|reward_id| {
            tx.append_reward_grant(NewRewardGrant {
              user_id,
              reward_id,
              created_at: evaluation.timestamp,
            })
          })
          .transpose()?;

        Ok(Ok(Claim { interaction, reward }))
      });

    async move { unit_of_work.await.map_err(ClaimError::Store)? }
  }

  /// Current streak position and cooldown for `user_id`. Informational only;
  /// [`Self::claim`] always recomputes from the server clock.
  pub async fn status(&self, user_id: Uuid) -> Result<StreakStatus, ClaimError<S::Error>> {
    let user = self
      .store
      .get_user(user_id)
      .await
      .map_err(ClaimError::Store)?
      .ok_or(ClaimError::UserNotFound(user_id))?;

    let streak_id = user.settings.streak_id;
    let config = self
      .catalog
      .get(&streak_id)
      .ok_or_else(|| ClaimError::UnknownStreak(streak_id.clone()))?;

    let last = self
      .store
      .last_interaction(user_id, &streak_id)
      .await
      .map_err(ClaimError::Store)?;

    let remaining = remaining_cooldown(config, last.as_ref(), self.clock.now()).ceil() as u64;

    Ok(StreakStatus {
      allow_tracking: user.settings.allow_tracking,
      claim_interval_seconds: config.claim_interval_seconds,
      last_interaction: last,
      remaining_seconds: remaining,
      streak_id,
    })
  }
}

#[cfg(test)]
mod tests;
