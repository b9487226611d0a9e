//! Interactions: the append-only record of accepted claims.
//!
//! Only the most recent interaction for a `(user, streak)` pair is ever read
//! back; older rows are kept as an audit trail and never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An accepted claim. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
  pub interaction_id: Uuid,
  pub user_id:        Uuid,
  pub streak_id:      String,
  /// Server-assigned; never taken from the client.
  pub timestamp:      DateTime<Utc>,
  /// 1-based position within the current streak run.
  pub serial_number:  u32,
}

/// Input to [`crate::store::StreakTx::append_interaction`].
/// The `interaction_id` is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewInteraction {
  pub user_id:       Uuid,
  pub streak_id:     String,
  pub timestamp:     DateTime<Utc>,
  pub serial_number: u32,
}
