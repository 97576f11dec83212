//! Error types for `warden-core`.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::status::AccountStatus;

// ─── Transition errors ───────────────────────────────────────────────────────

/// Rejections raised by the transition guard. The policy is left untouched;
/// the caller surfaces the message and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
  /// The operation is not permitted from the current derived status. `to` is
  /// the status the candidate policy would have reached.
  #[error("invalid account status transition: {from} -> {to}")]
  InvalidTransition {
    from: AccountStatus,
    to:   AccountStatus,
  },

  #[error("temporarily disabled window requires both bounds")]
  TemporaryWindowMissingBound,

  #[error("temporarily_disabled_from must be before temporarily_disabled_until")]
  TemporaryWindowInverted,

  #[error("account_valid_from must be before account_valid_until")]
  ValidPeriodInverted,

  #[error("account_valid_from must be before temporarily_disabled_from")]
  ValidFromNotBeforeTemporaryWindow,

  #[error("temporarily_disabled_until must be before account_valid_until")]
  TemporaryWindowNotBeforeValidUntil,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Lifecycle check errors ──────────────────────────────────────────────────

/// The login-path denial, one variant per non-normal status.
///
/// Always recoverable: the session pipeline denies the request and surfaces
/// the structured info, never the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
  #[error("user is disabled")]
  Disabled { reason: Option<String> },

  /// Deletion scheduled by the end user themselves.
  #[error("user is deactivated")]
  Deactivated,

  #[error("user is scheduled for deletion")]
  ScheduledDeletionByAdmin { delete_at: Option<DateTime<Utc>> },

  #[error("user is scheduled for anonymization")]
  ScheduledAnonymizationByAdmin { anonymize_at: Option<DateTime<Utc>> },

  #[error("user is anonymized")]
  Anonymized,

  #[error("user is outside valid period")]
  OutsideValidPeriod,
}

/// Whether `err`, or anything in its source chain, is a lifecycle denial.
///
/// Lets callers tell account-status failures apart from other authentication
/// failures without matching on every wrapper type in between.
pub fn is_account_status_error(err: &(dyn std::error::Error + 'static)) -> bool {
  let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
  while let Some(e) = current {
    if e.is::<CheckError>() {
      return true;
    }
    current = e.source();
  }
  false
}

// ─── Store errors ────────────────────────────────────────────────────────────

/// Failures at the persistence boundary, generic over the backend's own
/// error type.
///
/// `Conflict` is the optimistic-concurrency signal: the caller reloads and
/// retries the whole read-evaluate-write cycle. It is never surfaced to the
/// end user as a lifecycle error.
#[derive(Debug, Error)]
pub enum StoreError<E: std::error::Error> {
  #[error("account not found: {0}")]
  NotFound(Uuid),

  #[error("account already has a policy row: {0}")]
  AlreadyExists(Uuid),

  #[error("concurrent modification of account {0}")]
  Conflict(Uuid),

  #[error("backend error: {0}")]
  Backend(#[source] E),
}
