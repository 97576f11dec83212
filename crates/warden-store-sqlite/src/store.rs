//! [`SqliteStore`] — the SQLite implementation of [`PolicyStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use warden_core::{
  error::StoreError,
  policy::Policy,
  store::{PolicyStore, StoredPolicy},
};

use crate::{
  encode::{
    encode_dt, encode_opt_dt, encode_tri, encode_uuid, RawPolicyRow, COLUMNS,
  },
  error::StoreResult,
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Warden policy store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
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
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn row_exists(&self, account_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(account_id);
    let exists: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM account_status WHERE account_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }
}

fn backend(e: impl Into<Error>) -> StoreError<Error> {
  StoreError::Backend(e.into())
}

// ─── PolicyStore impl ────────────────────────────────────────────────────────

impl PolicyStore for SqliteStore {
  type Error = Error;

  async fn create(&self, account_id: Uuid) -> StoreResult<StoredPolicy> {
    let policy = Policy::new();
    let now = Utc::now();

    let id_str = encode_uuid(account_id);
    let ind_val = encode_tri(policy.is_indefinitely_disabled);
    let deact_val = encode_tri(policy.is_deactivated);
    let anon_val = encode_tri(policy.is_anonymized);
    let now_str = encode_dt(now);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO account_status (
             account_id, is_disabled, is_indefinitely_disabled,
             is_deactivated, is_anonymized, version, updated_at
           ) VALUES (?1, 0, ?2, ?3, ?4, 1, ?5)",
          rusqlite::params![id_str, ind_val, deact_val, anon_val, now_str],
        )?;
        Ok(n > 0)
      })
      .await
      .map_err(backend)?;

    if !inserted {
      return Err(StoreError::AlreadyExists(account_id));
    }

    Ok(StoredPolicy {
      account_id,
      policy,
      version: 1,
      updated_at: now,
    })
  }

  async fn load(&self, account_id: Uuid) -> StoreResult<StoredPolicy> {
    let id_str = encode_uuid(account_id);
    let sql = format!(
      "SELECT {COLUMNS} FROM account_status WHERE account_id = ?1"
    );

    let raw: Option<RawPolicyRow> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], |row| {
              RawPolicyRow::from_row(row)
            })
            .optional()?,
        )
      })
      .await
      .map_err(backend)?;

    match raw {
      Some(raw) => raw.into_stored().map_err(backend),
      None => Err(StoreError::NotFound(account_id)),
    }
  }

  async fn save(
    &self,
    account_id: Uuid,
    policy: &Policy,
    expected_version: i64,
  ) -> StoreResult<StoredPolicy> {
    let now = Utc::now();

    let id_str = encode_uuid(account_id);
    let is_disabled = policy.is_disabled;
    let ind_val = encode_tri(policy.is_indefinitely_disabled);
    let deact_val = encode_tri(policy.is_deactivated);
    let reason = policy.disable_reason.clone();
    let temp_from_str = encode_opt_dt(policy.temporarily_disabled_from);
    let temp_until_str = encode_opt_dt(policy.temporarily_disabled_until);
    let valid_from_str = encode_opt_dt(policy.account_valid_from);
    let valid_until_str = encode_opt_dt(policy.account_valid_until);
    let delete_at_str = encode_opt_dt(policy.delete_at);
    let anonymize_at_str = encode_opt_dt(policy.anonymize_at);
    let anon_val = encode_tri(policy.is_anonymized);
    let anonymized_at_str = encode_opt_dt(policy.anonymized_at);
    let stale_from_str = encode_opt_dt(policy.status_stale_from);
    let now_str = encode_dt(now);

    let updated: bool = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE account_status SET
             is_disabled                = ?1,
             is_indefinitely_disabled   = ?2,
             is_deactivated             = ?3,
             disable_reason             = ?4,
             temporarily_disabled_from  = ?5,
             temporarily_disabled_until = ?6,
             account_valid_from         = ?7,
             account_valid_until        = ?8,
             delete_at                  = ?9,
             anonymize_at               = ?10,
             is_anonymized              = ?11,
             anonymized_at              = ?12,
             status_stale_from          = ?13,
             version                    = version + 1,
             updated_at                 = ?14
           WHERE account_id = ?15 AND version = ?16",
          rusqlite::params![
            is_disabled,
            ind_val,
            deact_val,
            reason,
            temp_from_str,
            temp_until_str,
            valid_from_str,
            valid_until_str,
            delete_at_str,
            anonymize_at_str,
            anon_val,
            anonymized_at_str,
            stale_from_str,
            now_str,
            id_str,
            expected_version,
          ],
        )?;
        Ok(n > 0)
      })
      .await
      .map_err(backend)?;

    if updated {
      return Ok(StoredPolicy {
        account_id,
        policy: policy.clone(),
        version: expected_version + 1,
        updated_at: now,
      });
    }

    // Zero rows: either the account never existed or the version moved.
    if self.row_exists(account_id).await.map_err(backend)? {
      Err(StoreError::Conflict(account_id))
    } else {
      Err(StoreError::NotFound(account_id))
    }
  }

  async fn list_stale(
    &self,
    now: DateTime<Utc>,
    limit: usize,
  ) -> StoreResult<Vec<StoredPolicy>> {
    let now_str = encode_dt(now);
    let sql = format!(
      "SELECT {COLUMNS} FROM account_status
       WHERE status_stale_from IS NOT NULL AND status_stale_from <= ?1
       ORDER BY status_stale_from LIMIT ?2"
    );

    let raws: Vec<RawPolicyRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![now_str, limit as i64], |row| {
            RawPolicyRow::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(backend)?;

    raws
      .into_iter()
      .map(|raw| raw.into_stored().map_err(backend))
      .collect()
  }
}
