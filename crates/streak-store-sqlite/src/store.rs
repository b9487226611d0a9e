//! [`SqliteStore`], the SQLite implementation of [`StreakStore`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use streak_core::{
  interaction::{Interaction, NewInteraction},
  reward::{NewRewardGrant, RewardCount, RewardGrant},
  store::{StreakStore, StreakTx},
  user::{Credentials, NewUser, User, UserSettings},
};

use crate::{
  Error, Result,
  encode::{EncodedGrant, RawInteraction, RawUser, decode_uuid, encode_dt, encode_uuid},
  schema::SCHEMA,
};

/// How long a connection waits on another process's write lock before the
/// attempt is reported as a conflict.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Shared queries ──────────────────────────────────────────────────────────

fn select_last_interaction(
  conn: &Connection,
  user_id: &str,
  streak_id: &str,
) -> rusqlite::Result<Option<RawInteraction>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM interactions
         WHERE user_id = ?1 AND streak_id = ?2
         ORDER BY timestamp DESC, rowid DESC
         LIMIT 1",
        RawInteraction::COLUMNS
      ),
      rusqlite::params![user_id, streak_id],
      RawInteraction::from_row,
    )
    .optional()
}

fn select_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS),
      rusqlite::params![user_id],
      RawUser::from_row,
    )
    .optional()
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A streak store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("sqlite schema initialised");
    Ok(())
  }
}

// ─── Unit of work ────────────────────────────────────────────────────────────

/// An open `BEGIN IMMEDIATE` transaction. Dropped without commit, it rolls
/// back.
pub struct SqliteTx<'c> {
  tx: rusqlite::Transaction<'c>,
}

impl StreakTx for SqliteTx<'_> {
  type Error = Error;

  fn user_settings(&mut self, user_id: Uuid) -> Result<Option<UserSettings>> {
    let raw = select_user(&self.tx, &encode_uuid(user_id))?;
    Ok(raw.map(|u| UserSettings {
      allow_tracking: u.allow_tracking,
      streak_id:      u.streak_id,
    }))
  }

  fn last_interaction(
    &mut self,
    user_id: Uuid,
    streak_id: &str,
  ) -> Result<Option<Interaction>> {
    select_last_interaction(&self.tx, &encode_uuid(user_id), streak_id)?
      .map(RawInteraction::into_interaction)
      .transpose()
  }

  fn append_interaction(&mut self, input: NewInteraction) -> Result<Interaction> {
    let interaction = Interaction {
      interaction_id: Uuid::new_v4(),
      user_id:        input.user_id,
      streak_id:      input.streak_id,
      timestamp:      input.timestamp,
      serial_number:  input.serial_number,
    };

    self.tx.execute(
      "INSERT INTO interactions (interaction_id, user_id, streak_id, timestamp, serial_number)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![
        encode_uuid(interaction.interaction_id),
        encode_uuid(interaction.user_id),
        interaction.streak_id,
        encode_dt(interaction.timestamp),
        i64::from(interaction.serial_number),
      ],
    )?;

    Ok(interaction)
  }

  fn append_reward_grant(&mut self, input: NewRewardGrant) -> Result<RewardGrant> {
    let grant = RewardGrant {
      grant_id:   Uuid::new_v4(),
      user_id:    input.user_id,
      reward_id:  input.reward_id,
      created_at: input.created_at,
    };

    let row = EncodedGrant::from(&grant);
    self.tx.execute(
      "INSERT INTO reward_grants (grant_id, user_id, reward_id, created_at)
       VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![row.grant_id, row.user_id, row.reward_id, row.created_at],
    )?;

    Ok(grant)
  }
}

// ─── StreakStore impl ────────────────────────────────────────────────────────

impl StreakStore for SqliteStore {
  type Error = Error;
  type Tx<'c> = SqliteTx<'c>;

  // ── Claims ────────────────────────────────────────────────────────────────

  async fn transaction<F, R>(&self, f: F) -> Result<R>
  where
    F: for<'c> FnOnce(&mut Self::Tx<'c>) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock now, before `f` reads anything.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut unit = SqliteTx { tx };

        Ok(match f(&mut unit) {
          Ok(value) => unit.tx.commit().map(|()| value).map_err(Error::from),
          Err(e) => Err(e),
        })
      })
      .await?
  }

  async fn last_interaction(
    &self,
    user_id: Uuid,
    streak_id: &str,
  ) -> Result<Option<Interaction>> {
    let user_id_str = encode_uuid(user_id);
    let streak_id = streak_id.to_owned();

    let raw = self
      .conn
      .call(move |conn| Ok(select_last_interaction(conn, &user_id_str, &streak_id)?))
      .await?;

    raw.map(RawInteraction::into_interaction).transpose()
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:    Uuid::new_v4(),
      email:      input.email,
      created_at: Utc::now(),
      settings:   input.settings,
    };

    let id_str    = encode_uuid(user.user_id);
    let email     = user.email.clone();
    let at_str    = encode_dt(user.created_at);
    let allow     = user.settings.allow_tracking;
    let streak_id = user.settings.streak_id.clone();
    let hash      = input.password_hash;

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO users (user_id, email, password_hash, allow_tracking, streak_id, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, email, hash, allow, streak_id, at_str],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateEmail(user.email));
    }
    Ok(user)
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(user_id);

    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, &id_str)?))
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>> {
    let email = email.to_owned();

    let raw: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, password_hash FROM users WHERE email = ?1",
              rusqlite::params![email],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(id, password_hash)| -> Result<Credentials> {
        Ok(Credentials { user_id: decode_uuid(&id)?, password_hash })
      })
      .transpose()
  }

  async fn set_allow_tracking(
    &self,
    user_id: Uuid,
    allow_tracking: bool,
  ) -> Result<Option<UserSettings>> {
    let id_str = encode_uuid(user_id);

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET allow_tracking = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, allow_tracking],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_user(conn, &id_str)?)
      })
      .await?;

    Ok(raw.map(|u| UserSettings {
      allow_tracking: u.allow_tracking,
      streak_id:      u.streak_id,
    }))
  }

  // ── Rewards ───────────────────────────────────────────────────────────────

  async fn reward_counts(&self, user_id: Uuid) -> Result<Vec<RewardCount>> {
    let id_str = encode_uuid(user_id);

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT reward_id, COUNT(*) FROM reward_grants
           WHERE user_id = ?1
           GROUP BY reward_id
           ORDER BY reward_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(reward_id, count)| -> Result<RewardCount> {
        let count = u64::try_from(count)
          .map_err(|_| Error::Decode(format!("negative grant count for {reward_id:?}")))?;
        Ok(RewardCount { reward_id, count })
      })
      .collect()
  }
}
