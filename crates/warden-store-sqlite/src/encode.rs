//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings (fixed `+00:00` offset, so
//! lexicographic comparison in SQL matches chronological order). Tri-states
//! are nullable INTEGERs where NULL means `Unset`. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_core::{
  policy::{Policy, TriState},
  store::StoredPolicy,
};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_opt_dt(dt: Option<DateTime<Utc>>) -> Option<String> {
  dt.map(encode_dt)
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── TriState ────────────────────────────────────────────────────────────────

pub fn encode_tri(t: TriState) -> Option<i64> {
  Option::<bool>::from(t).map(i64::from)
}

pub fn decode_tri(v: Option<i64>) -> TriState {
  TriState::from(v.map(|n| n != 0))
}

// ─── Raw row ─────────────────────────────────────────────────────────────────

/// An `account_status` row as read from SQLite, before decoding.
pub struct RawPolicyRow {
  pub account_id:                 String,
  pub is_disabled:                bool,
  pub is_indefinitely_disabled:   Option<i64>,
  pub is_deactivated:             Option<i64>,
  pub disable_reason:             Option<String>,
  pub temporarily_disabled_from:  Option<String>,
  pub temporarily_disabled_until: Option<String>,
  pub account_valid_from:         Option<String>,
  pub account_valid_until:        Option<String>,
  pub delete_at:                  Option<String>,
  pub anonymize_at:               Option<String>,
  pub is_anonymized:              Option<i64>,
  pub anonymized_at:              Option<String>,
  pub status_stale_from:          Option<String>,
  pub version:                    i64,
  pub updated_at:                 String,
}

/// Column list shared by every SELECT; must stay in sync with
/// [`RawPolicyRow::from_row`].
pub const COLUMNS: &str = "account_id, is_disabled, is_indefinitely_disabled, \
  is_deactivated, disable_reason, temporarily_disabled_from, \
  temporarily_disabled_until, account_valid_from, account_valid_until, \
  delete_at, anonymize_at, is_anonymized, anonymized_at, status_stale_from, \
  version, updated_at";

impl RawPolicyRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:                 row.get(0)?,
      is_disabled:                row.get(1)?,
      is_indefinitely_disabled:   row.get(2)?,
      is_deactivated:             row.get(3)?,
      disable_reason:             row.get(4)?,
      temporarily_disabled_from:  row.get(5)?,
      temporarily_disabled_until: row.get(6)?,
      account_valid_from:         row.get(7)?,
      account_valid_until:        row.get(8)?,
      delete_at:                  row.get(9)?,
      anonymize_at:               row.get(10)?,
      is_anonymized:              row.get(11)?,
      anonymized_at:              row.get(12)?,
      status_stale_from:          row.get(13)?,
      version:                    row.get(14)?,
      updated_at:                 row.get(15)?,
    })
  }

  pub fn into_stored(self) -> Result<StoredPolicy> {
    let policy = Policy {
      is_disabled:                self.is_disabled,
      is_indefinitely_disabled:   decode_tri(self.is_indefinitely_disabled),
      is_deactivated:             decode_tri(self.is_deactivated),
      disable_reason:             self.disable_reason,
      temporarily_disabled_from:  decode_opt_dt(self.temporarily_disabled_from)?,
      temporarily_disabled_until: decode_opt_dt(self.temporarily_disabled_until)?,
      account_valid_from:         decode_opt_dt(self.account_valid_from)?,
      account_valid_until:        decode_opt_dt(self.account_valid_until)?,
      delete_at:                  decode_opt_dt(self.delete_at)?,
      anonymize_at:               decode_opt_dt(self.anonymize_at)?,
      is_anonymized:              decode_tri(self.is_anonymized),
      anonymized_at:              decode_opt_dt(self.anonymized_at)?,
      status_stale_from:          decode_opt_dt(self.status_stale_from)?,
    };
    Ok(StoredPolicy {
      account_id: decode_uuid(&self.account_id)?,
      policy,
      version: self.version,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
