//! The raw, persisted lifecycle fields for one account.
//!
//! A `Policy` carries no behaviour beyond normalization. The authoritative
//! lifecycle status is always derived from these fields and a reference time;
//! see [`crate::status`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::StatusView;

// ─── TriState ────────────────────────────────────────────────────────────────

/// A three-valued boolean for columns that predate their own introduction.
///
/// Rows written before a column existed carry NULL there; `Unset` is that
/// NULL. Normalization collapses it to `False` the moment a policy crosses a
/// construction or mutation boundary, so no reader ever branches on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum TriState {
  #[default]
  Unset,
  False,
  True,
}

impl TriState {
  pub fn normalized(self) -> Self {
    match self {
      Self::Unset => Self::False,
      other => other,
    }
  }

  pub fn is_true(self) -> bool { matches!(self, Self::True) }
}

impl From<Option<bool>> for TriState {
  fn from(value: Option<bool>) -> Self {
    match value {
      None => Self::Unset,
      Some(false) => Self::False,
      Some(true) => Self::True,
    }
  }
}

impl From<TriState> for Option<bool> {
  fn from(value: TriState) -> Self {
    match value {
      TriState::Unset => None,
      TriState::False => Some(false),
      TriState::True => Some(true),
    }
  }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// The persisted lifecycle record for one account.
///
/// All fields at their defaults mean the account is normal. Fields are set
/// and cleared independently, at different times, by different actors
/// (end-user self-service, administrators, scheduled jobs); only the
/// derivation in [`crate::status`] decides which one currently wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
  /// Materialized cache of "cannot authenticate right now", kept in sync by
  /// every mutation and by the sweep. Bulk queries filter on this column;
  /// the remaining fields are the source of truth.
  pub is_disabled: bool,

  /// Whether an indefinite disablement is in effect, independent of any
  /// temporary window.
  pub is_indefinitely_disabled: TriState,

  /// Selects the by-end-user (`True`) vs by-admin (`False`) flavour of a
  /// scheduled deletion.
  pub is_deactivated: TriState,

  /// Human-readable reason attached to an indefinite or temporary
  /// disablement.
  pub disable_reason: Option<String>,

  /// Half-open interval `[from, until)` during which the account is
  /// disabled. Both bounds are present together; `from < until`.
  pub temporarily_disabled_from:  Option<DateTime<Utc>>,
  pub temporarily_disabled_until: Option<DateTime<Utc>>,

  /// Half-open validity window outside of which the account is disabled.
  /// Either bound may be set on its own.
  pub account_valid_from:  Option<DateTime<Utc>>,
  pub account_valid_until: Option<DateTime<Utc>>,

  /// Scheduled-deletion instant. Presence alone marks the account for
  /// deletion; `is_deactivated` selects the variant.
  pub delete_at: Option<DateTime<Utc>>,

  /// Scheduled-anonymization instant.
  pub anonymize_at: Option<DateTime<Utc>>,

  /// Whether anonymization has already been executed.
  pub is_anonymized: TriState,

  /// When anonymization executed.
  pub anonymized_at: Option<DateTime<Utc>>,

  /// Earliest future instant at which the derived status could flip because
  /// a window boundary is crossed; `None` when no boundary lies ahead.
  /// Recomputed on every mutation and by the sweep.
  pub status_stale_from: Option<DateTime<Utc>>,
}

impl Policy {
  /// The default policy of a freshly created account: normal, with the
  /// tri-states already normalized.
  pub fn new() -> Self {
    let mut policy = Self::default();
    policy.normalize();
    policy
  }

  /// Collapse `Unset` tri-states. Every path that hands a policy to readers
  /// goes through here first.
  pub fn normalize(&mut self) {
    self.is_indefinitely_disabled = self.is_indefinitely_disabled.normalized();
    self.is_deactivated = self.is_deactivated.normalized();
    self.is_anonymized = self.is_anonymized.normalized();
  }

  /// Bind this policy to a reference time, producing the evaluated view on
  /// which all queries and transitions operate.
  pub fn at(self, ref_time: DateTime<Utc>) -> StatusView {
    StatusView::new(self, ref_time)
  }
}
