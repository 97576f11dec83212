//! The `PolicyStore` and `Clock` traits and supporting types.
//!
//! Implemented by storage backends (e.g. `warden-store-sqlite`). Higher
//! layers (`warden-api`, `warden-server`) depend on these abstractions, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{error::StoreError, policy::Policy};

// ─── Stored row ──────────────────────────────────────────────────────────────

/// A policy row as persisted: the fields plus the concurrency metadata the
/// read-evaluate-write cycle needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPolicy {
  pub account_id: Uuid,
  pub policy:     Policy,
  /// Monotonically increasing; a save must present the version it read.
  pub version:    i64,
  pub updated_at: DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the policy persistence backend.
///
/// Writes are guarded by optimistic concurrency: the guard's legality checks
/// are only sound against the snapshot they were computed from, so a save
/// must fail with [`StoreError::Conflict`] if the row moved underneath the
/// caller. All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PolicyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the default policy row for a new account.
  /// Fails with [`StoreError::AlreadyExists`] if the account has one.
  fn create(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<StoredPolicy, StoreError<Self::Error>>> + Send + '_;

  /// Load the current row.
  /// Fails with [`StoreError::NotFound`] if the account has none.
  fn load(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<StoredPolicy, StoreError<Self::Error>>> + Send + '_;

  /// Persist `policy`, succeeding only if the stored version still equals
  /// `expected_version`. On [`StoreError::Conflict`] the caller reloads and
  /// retries the whole read-evaluate-write cycle.
  fn save<'a>(
    &'a self,
    account_id: Uuid,
    policy: &'a Policy,
    expected_version: i64,
  ) -> impl Future<Output = Result<StoredPolicy, StoreError<Self::Error>>> + Send + 'a;

  /// Rows whose materialized cache may be stale: `status_stale_from <= now`,
  /// oldest first. The sweep re-evaluates and re-persists each one.
  fn list_stale(
    &self,
    now: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<StoredPolicy>, StoreError<Self::Error>>> + Send + '_;
}

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Injected source of the reference time, so evaluation is deterministic in
/// tests.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// The production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}
