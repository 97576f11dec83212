//! Status derivation — the single authoritative lifecycle status.
//!
//! The status enum is never stored. It is recomputed from the raw policy
//! fields and a reference time on every load, so the persisted row and the
//! reported status cannot drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::CheckError, policy::Policy};

// ─── AccountStatus ───────────────────────────────────────────────────────────

/// The derived lifecycle status of an account at a reference time.
///
/// When several raw conditions hold at once, the variant declared earlier
/// wins — declaration order is the precedence order and is load-bearing. An
/// anonymized account whose validity window also excludes the reference time
/// must still report `Anonymized`: anonymization is irreversible and
/// dominates every other signal.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccountStatus {
  Anonymized,
  OutsideValidPeriod,
  ScheduledDeletionDisabled,
  ScheduledDeletionDeactivated,
  ScheduledAnonymizationDisabled,
  Disabled,
  DisabledTemporarily,
  Normal,
}

impl AccountStatus {
  pub fn is_normal(self) -> bool { matches!(self, Self::Normal) }
}

// ─── Derivation ──────────────────────────────────────────────────────────────

/// Derive the authoritative status for `policy` at `now`.
///
/// Conditions are tested in strict precedence order; the first match wins.
/// Both windows are half-open: `[from, until)`.
pub fn evaluate(policy: &Policy, now: DateTime<Utc>) -> AccountStatus {
  if policy.is_anonymized.is_true() {
    return AccountStatus::Anonymized;
  }

  let before_valid = policy.account_valid_from.is_some_and(|from| now < from);
  let after_valid = policy.account_valid_until.is_some_and(|until| now >= until);
  if before_valid || after_valid {
    return AccountStatus::OutsideValidPeriod;
  }

  if policy.delete_at.is_some() {
    return if policy.is_deactivated.is_true() {
      AccountStatus::ScheduledDeletionDeactivated
    } else {
      AccountStatus::ScheduledDeletionDisabled
    };
  }

  if policy.anonymize_at.is_some() {
    return AccountStatus::ScheduledAnonymizationDisabled;
  }

  if policy.is_indefinitely_disabled.is_true() {
    return AccountStatus::Disabled;
  }

  let in_temp_window = match (
    policy.temporarily_disabled_from,
    policy.temporarily_disabled_until,
  ) {
    (Some(from), Some(until)) => from <= now && now < until,
    _ => false,
  };
  if in_temp_window {
    return AccountStatus::DisabledTemporarily;
  }

  AccountStatus::Normal
}

/// The earliest instant strictly after `now` at which the derived status
/// could flip because a window boundary is crossed.
///
/// Only the four window boundaries participate. `delete_at` and
/// `anonymize_at` are one-shot instants acted on by an external executor,
/// not boundaries the materialized cache has to re-derive across.
pub fn stale_from(policy: &Policy, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
  [
    policy.account_valid_from,
    policy.account_valid_until,
    policy.temporarily_disabled_from,
    policy.temporarily_disabled_until,
  ]
  .into_iter()
  .flatten()
  .filter(|boundary| *boundary > now)
  .min()
}

// ─── StatusView ──────────────────────────────────────────────────────────────

/// A policy bound to a reference time — the computed read model.
///
/// Never stored; constructed fresh from every loaded row, so transition
/// legality is always judged against the derived status, not a stored one.
/// All read-only queries and every transition operation (see
/// [`crate::transition`]) live on this type. Operations return a new
/// [`Policy`]; the view itself is immutable.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
  pub(crate) policy:      Policy,
  /// The point in time against which the interval fields were evaluated.
  pub(crate) as_of:       DateTime<Utc>,
  pub(crate) status:      AccountStatus,
  pub(crate) is_disabled: bool,
  pub(crate) stale_from:  Option<DateTime<Utc>>,
}

impl StatusView {
  pub(crate) fn new(mut policy: Policy, as_of: DateTime<Utc>) -> Self {
    policy.normalize();
    let status = evaluate(&policy, as_of);
    Self {
      is_disabled: !status.is_normal(),
      stale_from: stale_from(&policy, as_of),
      policy,
      as_of,
      status,
    }
  }

  pub fn policy(&self) -> &Policy { &self.policy }

  pub fn as_of(&self) -> DateTime<Utc> { self.as_of }

  pub fn status(&self) -> AccountStatus { self.status }

  pub fn is_disabled(&self) -> bool { self.is_disabled }

  pub fn stale_from(&self) -> Option<DateTime<Utc>> { self.stale_from }

  pub fn is_anonymized(&self) -> bool { self.policy.is_anonymized.is_true() }

  /// The policy with its materialized cache and stale marker refreshed to
  /// this view's reference time. This is what the sweep persists.
  pub fn refreshed_policy(&self) -> Policy {
    let mut policy = self.policy.clone();
    policy.is_disabled = self.is_disabled;
    policy.status_stale_from = self.stale_from;
    policy
  }

  /// The login-path gate: `Ok(())` iff the account may authenticate.
  ///
  /// The mapping is exhaustive over [`AccountStatus`] and follows the same
  /// precedence the derivation does.
  pub fn check(&self) -> Result<(), CheckError> {
    match self.status {
      AccountStatus::Normal => Ok(()),
      AccountStatus::Disabled | AccountStatus::DisabledTemporarily => {
        Err(CheckError::Disabled {
          reason: self.policy.disable_reason.clone(),
        })
      }
      AccountStatus::ScheduledDeletionDeactivated => {
        Err(CheckError::Deactivated)
      }
      AccountStatus::ScheduledDeletionDisabled => {
        Err(CheckError::ScheduledDeletionByAdmin {
          delete_at: self.policy.delete_at,
        })
      }
      AccountStatus::ScheduledAnonymizationDisabled => {
        Err(CheckError::ScheduledAnonymizationByAdmin {
          anonymize_at: self.policy.anonymize_at,
        })
      }
      AccountStatus::Anonymized => Err(CheckError::Anonymized),
      AccountStatus::OutsideValidPeriod => Err(CheckError::OutsideValidPeriod),
    }
  }
}
