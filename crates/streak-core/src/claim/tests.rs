//! Claim service tests against an in-process store.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::*;
use crate::{
  clock::ManualClock,
  config::StreakConfig,
  reward::RewardCount,
  store::StoreErrorKind,
  user::{Credentials, NewUser, User, UserSettings},
};

// ─── In-memory store ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum MemoryError {
  #[error("simulated lock conflict")]
  Conflict,
  #[error("email already registered")]
  DuplicateEmail,
  #[error("simulated write failure")]
  WriteFailed,
}

impl StoreError for MemoryError {
  fn kind(&self) -> StoreErrorKind {
    match self {
      Self::Conflict => StoreErrorKind::Conflict,
      Self::DuplicateEmail => StoreErrorKind::DuplicateEmail,
      Self::WriteFailed => StoreErrorKind::Other,
    }
  }
}

#[derive(Debug, Clone, Default)]
struct State {
  users:        HashMap<Uuid, (User, String)>,
  interactions: Vec<Interaction>,
  grants:       Vec<RewardGrant>,
}

/// Commits by swapping in a staged copy of the state, so a failed unit of work
/// leaves nothing behind.
#[derive(Default)]
struct MemoryStore {
  state:       Mutex<State>,
  conflicts:   AtomicUsize,
  fail_grants: AtomicBool,
}

struct MemoryTx<'c> {
  state:       &'c mut State,
  fail_grants: bool,
}

fn latest<'a>(
  interactions: &'a [Interaction],
  user_id: Uuid,
  streak_id: &str,
) -> Option<&'a Interaction> {
  interactions
    .iter()
    .filter(|i| i.user_id == user_id && i.streak_id == streak_id)
    .max_by_key(|i| i.timestamp)
}

impl StreakTx for MemoryTx<'_> {
  type Error = MemoryError;

  fn user_settings(&mut self, user_id: Uuid) -> Result<Option<UserSettings>, MemoryError> {
    Ok(self.state.users.get(&user_id).map(|(u, _)| u.settings.clone()))
  }

  fn last_interaction(
    &mut self,
    user_id: Uuid,
    streak_id: &str,
  ) -> Result<Option<Interaction>, MemoryError> {
    Ok(latest(&self.state.interactions, user_id, streak_id).cloned())
  }

  fn append_interaction(&mut self, input: NewInteraction) -> Result<Interaction, MemoryError> {
    let interaction = Interaction {
      interaction_id: Uuid::new_v4(),
      user_id:        input.user_id,
      streak_id:      input.streak_id,
      timestamp:      input.timestamp,
      serial_number:  input.serial_number,
    };
    self.state.interactions.push(interaction.clone());
    Ok(interaction)
  }

  fn append_reward_grant(&mut self, input: NewRewardGrant) -> Result<RewardGrant, MemoryError> {
    if self.fail_grants {
      return Err(MemoryError::WriteFailed);
    }
    let grant = RewardGrant {
      grant_id:   Uuid::new_v4(),
      user_id:    input.user_id,
      reward_id:  input.reward_id,
      created_at: input.created_at,
    };
    self.state.grants.push(grant.clone());
    Ok(grant)
  }
}

impl StreakStore for MemoryStore {
  type Error = MemoryError;
  type Tx<'c> = MemoryTx<'c>;

  async fn transaction<F, R>(&self, f: F) -> Result<R, MemoryError>
  where
    F: for<'c> FnOnce(&mut Self::Tx<'c>) -> Result<R, MemoryError> + Send + 'static,
    R: Send + 'static,
  {
    if self
      .conflicts
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok()
    {
      return Err(MemoryError::Conflict);
    }

    let mut guard = self.state.lock().unwrap();
    let mut staged = guard.clone();
    let out = f(&mut MemoryTx {
      state:       &mut staged,
      fail_grants: self.fail_grants.load(Ordering::SeqCst),
    })?;
    *guard = staged;
    Ok(out)
  }

  async fn last_interaction(
    &self,
    user_id: Uuid,
    streak_id: &str,
  ) -> Result<Option<Interaction>, MemoryError> {
    let state = self.state.lock().unwrap();
    Ok(latest(&state.interactions, user_id, streak_id).cloned())
  }

  async fn create_user(&self, input: NewUser) -> Result<User, MemoryError> {
    let mut state = self.state.lock().unwrap();
    if state.users.values().any(|(u, _)| u.email == input.email) {
      return Err(MemoryError::DuplicateEmail);
    }
    let user = User {
      user_id:    Uuid::new_v4(),
      email:      input.email,
      created_at: Utc::now(),
      settings:   input.settings,
    };
    state
      .users
      .insert(user.user_id, (user.clone(), input.password_hash));
    Ok(user)
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, MemoryError> {
    let state = self.state.lock().unwrap();
    Ok(state.users.get(&user_id).map(|(u, _)| u.clone()))
  }

  async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, MemoryError> {
    let state = self.state.lock().unwrap();
    Ok(state.users.values().find(|(u, _)| u.email == email).map(|(u, hash)| {
      Credentials { user_id: u.user_id, password_hash: hash.clone() }
    }))
  }

  async fn set_allow_tracking(
    &self,
    user_id: Uuid,
    allow_tracking: bool,
  ) -> Result<Option<UserSettings>, MemoryError> {
    let mut state = self.state.lock().unwrap();
    Ok(state.users.get_mut(&user_id).map(|(u, _)| {
      u.settings.allow_tracking = allow_tracking;
      u.settings.clone()
    }))
  }

  async fn reward_counts(&self, user_id: Uuid) -> Result<Vec<RewardCount>, MemoryError> {
    let state = self.state.lock().unwrap();
    let mut counts: HashMap<String, u64> = HashMap::new();
    for grant in state.grants.iter().filter(|g| g.user_id == user_id) {
      *counts.entry(grant.reward_id.clone()).or_default() += 1;
    }
    Ok(
      counts
        .into_iter()
        .map(|(reward_id, count)| RewardCount { reward_id, count })
        .collect(),
    )
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn epoch() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() }

fn at(secs: i64) -> DateTime<Utc> { epoch() + TimeDelta::seconds(secs) }

struct Harness {
  service: ClaimService<MemoryStore>,
  store:   Arc<MemoryStore>,
  clock:   Arc<ManualClock>,
  user_id: Uuid,
}

impl Harness {
  async fn new() -> Self { Self::with_tracking(true).await }

  async fn with_tracking(allow_tracking: bool) -> Self {
    let catalog = StreakCatalog::single("daily", StreakConfig {
      claim_interval_seconds: 60.0,
      backoff_seconds:        30.0,
      min_interactions:       3,
      reward_id:              "gold-star".into(),
    })
    .unwrap();

    let store = Arc::new(MemoryStore::default());
    let clock = Arc::new(ManualClock::new(epoch()));
    let service = ClaimService::new(store.clone(), Arc::new(catalog), clock.clone());

    let user = store
      .create_user(NewUser {
        email:         "ada@example.com".into(),
        password_hash: "$argon2id$stub".into(),
        settings:      UserSettings { allow_tracking, streak_id: "daily".into() },
      })
      .await
      .unwrap();

    Self { service, store, clock, user_id: user.user_id }
  }

  async fn claim_at(&self, secs: i64) -> Result<Claim, ClaimError<MemoryError>> {
    self.clock.set(at(secs));
    self.service.claim(self.user_id).await
  }

  fn interaction_count(&self) -> usize { self.store.state.lock().unwrap().interactions.len() }

  fn grant_count(&self) -> usize { self.store.state.lock().unwrap().grants.len() }
}

// ─── Claims ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_claim_is_recorded_with_serial_one() {
  let h = Harness::new().await;

  let claim = h.claim_at(0).await.unwrap();
  assert_eq!(claim.interaction.serial_number, 1);
  assert_eq!(claim.interaction.timestamp, at(0));
  assert_eq!(claim.interaction.streak_id, "daily");
  assert!(claim.reward.is_none());
  assert_eq!(h.interaction_count(), 1);
}

#[tokio::test]
async fn threshold_grants_on_every_qualifying_claim() {
  let h = Harness::new().await;

  let mut reward_ids = Vec::new();
  for t in [0, 60, 120, 180] {
    let claim = h.claim_at(t).await.unwrap();
    reward_ids.push(claim.reward_id().map(str::to_owned));
  }

  assert_eq!(reward_ids, vec![
    None,
    None,
    Some("gold-star".to_string()),
    Some("gold-star".to_string()),
  ]);
  assert_eq!(h.grant_count(), 2);

  let counts = h.store.reward_counts(h.user_id).await.unwrap();
  assert_eq!(counts, vec![RewardCount { reward_id: "gold-star".into(), count: 2 }]);
}

#[tokio::test]
async fn grant_carries_the_claim_timestamp() {
  let h = Harness::new().await;
  for t in [0, 60] {
    h.claim_at(t).await.unwrap();
  }
  let claim = h.claim_at(120).await.unwrap();
  let grant = claim.reward.unwrap();
  assert_eq!(grant.created_at, claim.interaction.timestamp);
  assert_eq!(grant.user_id, h.user_id);
}

#[tokio::test]
async fn late_claim_restarts_the_run() {
  let h = Harness::new().await;

  let mut serials = Vec::new();
  for t in [0, 60, 155, 215] {
    serials.push(h.claim_at(t).await.unwrap().interaction.serial_number);
  }
  assert_eq!(serials, vec![1, 2, 1, 2]);
}

#[tokio::test]
async fn too_soon_writes_nothing() {
  let h = Harness::new().await;
  h.claim_at(0).await.unwrap();

  let err = h.claim_at(45).await.unwrap_err();
  match err {
    ClaimError::TooSoon(too_soon) => assert_eq!(too_soon.retry_after_secs(), 15),
    other => panic!("expected TooSoon, got {other:?}"),
  }
  assert_eq!(h.interaction_count(), 1);
}

#[tokio::test]
async fn tracking_disabled_is_rejected_before_evaluation() {
  let h = Harness::with_tracking(false).await;

  let err = h.claim_at(0).await.unwrap_err();
  assert!(matches!(err, ClaimError::TrackingDisabled));
  assert!(err.is_rejection());
  assert_eq!(h.interaction_count(), 0);
}

#[tokio::test]
async fn re_enabling_tracking_allows_claims() {
  let h = Harness::with_tracking(false).await;
  h.store.set_allow_tracking(h.user_id, true).await.unwrap();
  assert!(h.claim_at(0).await.is_ok());
}

#[tokio::test]
async fn unknown_user_is_not_a_rejection() {
  let h = Harness::new().await;
  let err = h.service.claim(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, ClaimError::UserNotFound(_)));
  assert!(!err.is_rejection());
}

#[tokio::test]
async fn unconfigured_streak_is_reported() {
  let h = Harness::new().await;
  let stray = h
    .store
    .create_user(NewUser {
      email:         "grace@example.com".into(),
      password_hash: "$argon2id$stub".into(),
      settings:      UserSettings { allow_tracking: true, streak_id: "retired".into() },
    })
    .await
    .unwrap();

  let err = h.service.claim(stray.user_id).await.unwrap_err();
  assert!(matches!(err, ClaimError::UnknownStreak(id) if id == "retired"));
}

// ─── Transactional behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn conflict_is_retried_once() {
  let h = Harness::new().await;
  h.store.conflicts.store(1, Ordering::SeqCst);

  let claim = h.claim_at(0).await.unwrap();
  assert_eq!(claim.interaction.serial_number, 1);
  assert_eq!(h.interaction_count(), 1);
}

#[tokio::test]
async fn second_conflict_is_surfaced() {
  let h = Harness::new().await;
  h.store.conflicts.store(2, Ordering::SeqCst);

  let err = h.claim_at(0).await.unwrap_err();
  assert!(matches!(err, ClaimError::Store(MemoryError::Conflict)));
  assert_eq!(h.interaction_count(), 0);
}

#[tokio::test]
async fn failed_grant_rolls_back_the_interaction() {
  let h = Harness::new().await;
  for t in [0, 60] {
    h.claim_at(t).await.unwrap();
  }
  h.store.fail_grants.store(true, Ordering::SeqCst);

  let err = h.claim_at(120).await.unwrap_err();
  assert!(matches!(err, ClaimError::Store(MemoryError::WriteFailed)));
  assert_eq!(h.interaction_count(), 2);
  assert_eq!(h.grant_count(), 0);

  // The failed claim left no trace, so the next one continues from serial 2.
  h.store.fail_grants.store(false, Ordering::SeqCst);
  let claim = h.claim_at(121).await.unwrap();
  assert_eq!(claim.interaction.serial_number, 3);
}

#[tokio::test]
async fn simultaneous_claims_commit_exactly_once() {
  let h = Harness::new().await;
  h.claim_at(0).await.unwrap();
  h.clock.set(at(60));

  let (a, b) = tokio::join!(
    h.service.claim(h.user_id),
    h.service.claim(h.user_id)
  );

  let accepted: Vec<_> = [&a, &b].into_iter().filter(|r| r.is_ok()).collect();
  assert_eq!(accepted.len(), 1);
  assert!(
    [a, b]
      .into_iter()
      .any(|r| matches!(r, Err(ClaimError::TooSoon(_))))
  );
  assert_eq!(h.interaction_count(), 2);
}

#[tokio::test]
async fn spawned_claims_commit_exactly_once() {
  let h = Harness::new().await;
  h.claim_at(0).await.unwrap();
  h.clock.set(at(60));

  let handles: Vec<_> = (0..3)
    .map(|_| {
      let service = h.service.clone();
      let user_id = h.user_id;
      tokio::spawn(async move { service.claim(user_id).await })
    })
    .collect();

  let mut accepted = 0;
  for handle in handles {
    if handle.await.unwrap().is_ok() {
      accepted += 1;
    }
  }
  assert_eq!(accepted, 1);
  assert_eq!(h.interaction_count(), 2);
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_reports_cooldown() {
  let h = Harness::new().await;

  let fresh = h.service.status(h.user_id).await.unwrap();
  assert!(fresh.last_interaction.is_none());
  assert_eq!(fresh.remaining_seconds, 0);
  assert!(fresh.allow_tracking);

  h.claim_at(0).await.unwrap();
  h.clock.set(at(20) + TimeDelta::milliseconds(500));

  let status = h.service.status(h.user_id).await.unwrap();
  assert_eq!(status.remaining_seconds, 40);
  assert_eq!(status.streak_id, "daily");
  assert_eq!(status.claim_interval_seconds, 60.0);
  assert_eq!(status.last_interaction.unwrap().serial_number, 1);
}

#[tokio::test]
async fn status_for_unknown_user() {
  let h = Harness::new().await;
  assert!(matches!(
    h.service.status(Uuid::new_v4()).await,
    Err(ClaimError::UserNotFound(_))
  ));
}
