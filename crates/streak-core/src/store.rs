//! The `StreakStore` trait and its transactional unit of work.
//!
//! The trait is implemented by storage backends (e.g. `streak-store-sqlite`).
//! Higher layers (`streak-server`) depend on this abstraction, not on any
//! concrete backend.
//!
//! # Transactional boundary
//!
//! A claim reads the user's most recent interaction, evaluates it, and then
//! appends a new interaction and possibly a reward grant. Those steps must be
//! serialized per `(user, streak)`: two concurrent claims must never both
//! continue the streak from the same prior state. Backends guarantee this by
//! running the closure passed to [`StreakStore::transaction`] under a write
//! lock that is taken *before* the first read, and by committing both appends
//! together or not at all.

use std::future::Future;

use uuid::Uuid;

use crate::{
  interaction::{Interaction, NewInteraction},
  reward::{NewRewardGrant, RewardCount, RewardGrant},
  user::{Credentials, NewUser, User, UserSettings},
};

// ─── Error classification ────────────────────────────────────────────────────

/// Coarse classification of a backend failure, for callers that need to react
/// differently to some of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
  /// Lost a race for the write lock. Retrying with a fresh read is safe.
  Conflict,
  /// A user with this email address already exists.
  DuplicateEmail,
  Other,
}

pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> StoreErrorKind;

  fn is_conflict(&self) -> bool { self.kind() == StoreErrorKind::Conflict }
}

// ─── Unit of work ────────────────────────────────────────────────────────────

/// Repository operations available inside [`StreakStore::transaction`].
///
/// Methods are synchronous: the whole unit of work runs while the backend
/// holds its lock, so nothing in it may await.
pub trait StreakTx {
  type Error;

  /// Settings for `user_id`, or `None` if the user does not exist.
  fn user_settings(
    &mut self,
    user_id: Uuid,
  ) -> Result<Option<UserSettings>, Self::Error>;

  /// The most recent interaction (by timestamp) for the pair, if any.
  fn last_interaction(
    &mut self,
    user_id: Uuid,
    streak_id: &str,
  ) -> Result<Option<Interaction>, Self::Error>;

  /// Append an interaction row. The `interaction_id` is assigned here.
  fn append_interaction(
    &mut self,
    input: NewInteraction,
  ) -> Result<Interaction, Self::Error>;

  /// Append a reward grant row. The `grant_id` is assigned here.
  fn append_reward_grant(
    &mut self,
    input: NewRewardGrant,
  ) -> Result<RewardGrant, Self::Error>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a streak store backend.
///
/// Interactions and reward grants are append-only; nothing here updates or
/// deletes them. User settings are the only mutable state.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait StreakStore: Send + Sync {
  type Error: StoreError;
  type Tx<'c>: StreakTx<Error = Self::Error>;

  // ── Claims ────────────────────────────────────────────────────────────

  /// Run `f` as one serialized unit of work.
  ///
  /// If `f` returns `Ok`, everything it appended is committed atomically. If
  /// it returns `Err`, nothing it appended is kept.
  fn transaction<F, R>(
    &self,
    f: F,
  ) -> impl Future<Output = Result<R, Self::Error>> + Send + '_
  where
    F: for<'c> FnOnce(&mut Self::Tx<'c>) -> Result<R, Self::Error>
      + Send
      + 'static,
    R: Send + 'static;

  /// Read-only lookup of the most recent interaction, outside any
  /// transaction. Suitable for display, never for deciding a claim.
  fn last_interaction<'a>(
    &'a self,
    user_id: Uuid,
    streak_id: &'a str,
  ) -> impl Future<Output = Result<Option<Interaction>, Self::Error>> + Send + 'a;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user. Fails with a [`StoreErrorKind::DuplicateEmail`] error if
  /// the address is taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up login credentials by email address.
  fn find_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  /// Turn tracking on or off. Returns the updated settings, or `None` if the
  /// user does not exist.
  fn set_allow_tracking(
    &self,
    user_id: Uuid,
    allow_tracking: bool,
  ) -> impl Future<Output = Result<Option<UserSettings>, Self::Error>> + Send + '_;

  // ── Rewards ───────────────────────────────────────────────────────────

  /// Number of grants per reward for a user. Rewards never granted are
  /// absent.
  fn reward_counts(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RewardCount>, Self::Error>> + Send + '_;
}
