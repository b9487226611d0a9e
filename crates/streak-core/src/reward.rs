//! Reward grants and the read-only reward catalog.
//!
//! A grant is one row per earned reward. The same reward can be granted to the
//! same user any number of times; the user's tally for a reward is simply the
//! number of rows.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Grants ──────────────────────────────────────────────────────────────────

/// A durable record that a user earned a reward. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardGrant {
  pub grant_id:   Uuid,
  pub user_id:    Uuid,
  pub reward_id:  String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::StreakTx::append_reward_grant`].
///
/// `created_at` is the timestamp of the interaction that earned the grant, so
/// both rows carry the same instant.
#[derive(Debug, Clone)]
pub struct NewRewardGrant {
  pub user_id:    Uuid,
  pub reward_id:  String,
  pub created_at: DateTime<Utc>,
}

/// Number of grants of one reward held by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardCount {
  pub reward_id: String,
  pub count:     u64,
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Display metadata for a reward. Loaded from configuration; never written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardInfo {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub image_url:   String,
}

/// A user's tally for one reward, joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSummary {
  pub count:       u64,
  pub title:       String,
  pub description: String,
  pub image_url:   String,
}

/// Join grant counts with catalog metadata, keyed by `reward_id`.
///
/// Rewards that have been granted but are missing from the catalog are still
/// reported, titled with their id.
pub fn summarize(
  counts: impl IntoIterator<Item = RewardCount>,
  catalog: &HashMap<String, RewardInfo>,
) -> BTreeMap<String, RewardSummary> {
  counts
    .into_iter()
    .map(|RewardCount { reward_id, count }| {
      let summary = match catalog.get(&reward_id) {
        Some(info) => RewardSummary {
          count,
          title:       info.title.clone(),
          description: info.description.clone(),
          image_url:   info.image_url.clone(),
        },
        None => RewardSummary {
          count,
          title:       reward_id.clone(),
          description: String::new(),
          image_url:   String::new(),
        },
      };
      (reward_id, summary)
    })
    .collect()
}
