//! The transition guard — one operation per administrative or end-user
//! action.
//!
//! Every operation derives a full candidate [`Policy`], validates it, and
//! returns it; nothing is mutated in place. Two independent layers apply:
//! type legality (the operation must start from specific derived statuses)
//! and window consistency (ordering invariants across the temporary and
//! validity windows). Legality is always checked against the status derived
//! at the view's reference time — a temporary window that has already lapsed
//! counts as normal here.

use chrono::{DateTime, Utc};

use crate::{
  error::{Error, Result},
  policy::{Policy, TriState},
  status::{evaluate, AccountStatus, StatusView},
};

impl StatusView {
  // ── Disablement ───────────────────────────────────────────────────────

  /// Clear an indefinite or temporary disablement.
  pub fn reenable(&self) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.is_indefinitely_disabled = TriState::False;
    candidate.disable_reason = None;
    candidate.temporarily_disabled_from = None;
    candidate.temporarily_disabled_until = None;
    self.permit(&candidate, &[
      AccountStatus::Disabled,
      AccountStatus::DisabledTemporarily,
      AccountStatus::OutsideValidPeriod,
    ])?;
    Ok(self.finalize(candidate))
  }

  /// Disable the account until further notice, replacing any temporary
  /// window.
  pub fn disable_indefinitely(&self, reason: Option<String>) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.is_indefinitely_disabled = TriState::True;
    candidate.disable_reason = reason;
    candidate.temporarily_disabled_from = None;
    candidate.temporarily_disabled_until = None;
    self.permit(&candidate, &[
      AccountStatus::Normal,
      AccountStatus::DisabledTemporarily,
      AccountStatus::OutsideValidPeriod,
    ])?;
    Ok(self.finalize(candidate))
  }

  /// Disable the account for the half-open window `[from, until)`,
  /// replacing any indefinite disablement.
  pub fn disable_temporarily(
    &self,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    reason: Option<String>,
  ) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.is_indefinitely_disabled = TriState::False;
    candidate.temporarily_disabled_from = Some(from);
    candidate.temporarily_disabled_until = Some(until);
    candidate.disable_reason = reason;
    self.permit(&candidate, &[
      AccountStatus::Normal,
      AccountStatus::Disabled,
      AccountStatus::DisabledTemporarily,
    ])?;
    check_windows(&candidate, self.as_of)?;
    Ok(self.finalize(candidate))
  }

  // ── Validity window ───────────────────────────────────────────────────

  /// Set or clear the start of the validity window.
  pub fn set_account_valid_from(
    &self,
    at: Option<DateTime<Utc>>,
  ) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.account_valid_from = at;
    self.permit_not_anonymized(&candidate)?;
    check_windows(&candidate, self.as_of)?;
    Ok(self.finalize(candidate))
  }

  /// Set or clear the end of the validity window.
  pub fn set_account_valid_until(
    &self,
    at: Option<DateTime<Utc>>,
  ) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.account_valid_until = at;
    self.permit_not_anonymized(&candidate)?;
    check_windows(&candidate, self.as_of)?;
    Ok(self.finalize(candidate))
  }

  /// Set or clear both validity bounds at once.
  pub fn set_account_valid_period(
    &self,
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
  ) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.account_valid_from = from;
    candidate.account_valid_until = until;
    self.permit_not_anonymized(&candidate)?;
    check_windows(&candidate, self.as_of)?;
    Ok(self.finalize(candidate))
  }

  // ── Scheduled deletion ────────────────────────────────────────────────

  /// Self-service deactivation: the end user schedules their own deletion.
  pub fn schedule_deletion_by_end_user(
    &self,
    delete_at: DateTime<Utc>,
  ) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.delete_at = Some(delete_at);
    candidate.is_deactivated = TriState::True;
    self.permit(&candidate, &[AccountStatus::Normal])?;
    Ok(self.finalize(candidate))
  }

  /// Schedule a deletion administratively. Permitted from any status without
  /// a scheduled deletion; re-scheduling an already scheduled one is
  /// rejected. `is_anonymized` and `is_deactivated` are kept as they are.
  pub fn schedule_deletion_by_admin(
    &self,
    delete_at: DateTime<Utc>,
  ) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.delete_at = Some(delete_at);
    if self.policy.delete_at.is_some() {
      return Err(self.transition_error(&candidate));
    }
    Ok(self.finalize(candidate))
  }

  /// Cancel a scheduled deletion. Clears only `delete_at`; a completed
  /// anonymization survives the detour.
  pub fn unschedule_deletion_by_admin(&self) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.delete_at = None;
    if self.policy.delete_at.is_none() {
      return Err(self.transition_error(&candidate));
    }
    Ok(self.finalize(candidate))
  }

  // ── Anonymization ─────────────────────────────────────────────────────

  /// Mark anonymization as executed, stamping the view's reference time.
  ///
  /// Invoked by the executor when `anonymize_at` is reached, or directly by
  /// an administrator. The disablement fields and the fulfilled schedule are
  /// cleared; anonymization is irreversible.
  pub fn anonymize(&self) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.is_anonymized = TriState::True;
    candidate.anonymized_at = Some(self.as_of);
    candidate.anonymize_at = None;
    candidate.is_indefinitely_disabled = TriState::False;
    candidate.disable_reason = None;
    candidate.temporarily_disabled_from = None;
    candidate.temporarily_disabled_until = None;
    self.permit(&candidate, &[
      AccountStatus::Normal,
      AccountStatus::ScheduledAnonymizationDisabled,
    ])?;
    Ok(self.finalize(candidate))
  }

  /// Schedule an anonymization administratively. Permitted from any status
  /// without one scheduled already, except an anonymized account.
  pub fn schedule_anonymization_by_admin(
    &self,
    anonymize_at: DateTime<Utc>,
  ) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.anonymize_at = Some(anonymize_at);
    if self.policy.anonymize_at.is_some()
      || self.status == AccountStatus::Anonymized
    {
      return Err(self.transition_error(&candidate));
    }
    Ok(self.finalize(candidate))
  }

  /// Cancel a scheduled anonymization.
  pub fn unschedule_anonymization_by_admin(&self) -> Result<Policy> {
    let mut candidate = self.policy.clone();
    candidate.anonymize_at = None;
    if self.policy.anonymize_at.is_none() {
      return Err(self.transition_error(&candidate));
    }
    Ok(self.finalize(candidate))
  }

  // ── Guard internals ───────────────────────────────────────────────────

  fn transition_error(&self, candidate: &Policy) -> Error {
    Error::InvalidTransition {
      from: self.status,
      to:   evaluate(candidate, self.as_of),
    }
  }

  /// Type-legality layer: the operation must start from one of `allowed`.
  fn permit(
    &self,
    candidate: &Policy,
    allowed: &[AccountStatus],
  ) -> Result<()> {
    if allowed.contains(&self.status) {
      Ok(())
    } else {
      Err(self.transition_error(candidate))
    }
  }

  fn permit_not_anonymized(&self, candidate: &Policy) -> Result<()> {
    if self.status == AccountStatus::Anonymized {
      Err(self.transition_error(candidate))
    } else {
      Ok(())
    }
  }

  /// Normalize tri-states and refresh the materialized cache and stale
  /// marker before the candidate leaves the guard.
  fn finalize(&self, candidate: Policy) -> Policy {
    candidate.at(self.as_of).refreshed_policy()
  }
}

// ─── Window consistency ──────────────────────────────────────────────────────

/// Window-consistency layer, applied whenever a window bound is mutated.
///
/// A temporarily-disabled window that has already ended (`until <= now`) is
/// excluded from the cross-check: past windows cannot constrain a newly-set
/// validity period.
fn check_windows(candidate: &Policy, now: DateTime<Utc>) -> Result<()> {
  let temp_window = match (
    candidate.temporarily_disabled_from,
    candidate.temporarily_disabled_until,
  ) {
    (Some(from), Some(until)) => Some((from, until)),
    (None, None) => None,
    _ => return Err(Error::TemporaryWindowMissingBound),
  };

  if let Some((from, until)) = temp_window {
    if from >= until {
      return Err(Error::TemporaryWindowInverted);
    }
  }

  if let (Some(from), Some(until)) =
    (candidate.account_valid_from, candidate.account_valid_until)
  {
    if from >= until {
      return Err(Error::ValidPeriodInverted);
    }
  }

  if let Some((temp_from, temp_until)) = temp_window {
    if temp_until > now {
      if candidate
        .account_valid_from
        .is_some_and(|valid_from| valid_from >= temp_from)
      {
        return Err(Error::ValidFromNotBeforeTemporaryWindow);
      }
      if candidate
        .account_valid_until
        .is_some_and(|valid_until| temp_until >= valid_until)
      {
        return Err(Error::TemporaryWindowNotBeforeValidUntil);
      }
    }
  }

  Ok(())
}
