//! The background sweep that keeps materialized caches fresh.
//!
//! Rows past their stale-from marker are re-evaluated and re-persisted under
//! the same optimistic-concurrency discipline as interactive mutations. A
//! conflict means another writer already touched the row; if it is still
//! stale the next pass picks it up again, so conflicts are only counted,
//! never retried inline.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use warden_core::{
  error::StoreError,
  store::{Clock, PolicyStore},
};

/// Outcome counters for one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
  pub scanned:   usize,
  pub refreshed: usize,
  pub conflicts: usize,
}

/// Re-derive and persist every row due at `now`.
///
/// Idempotent: re-deriving an unchanged row at a later time only ever
/// advances the derivation, and a refreshed row leaves the stale set until
/// its next window boundary.
pub async fn sweep_once<S>(
  store: &S,
  now: DateTime<Utc>,
  batch: usize,
) -> Result<SweepStats, StoreError<S::Error>>
where
  S: PolicyStore,
{
  let rows = store.list_stale(now, batch).await?;
  let mut stats = SweepStats {
    scanned: rows.len(),
    ..SweepStats::default()
  };

  for row in rows {
    let account_id = row.account_id;
    let version = row.version;
    let refreshed = row.policy.at(now).refreshed_policy();
    match store.save(account_id, &refreshed, version).await {
      Ok(_) => stats.refreshed += 1,
      Err(StoreError::Conflict(_)) => {
        stats.conflicts += 1;
        tracing::debug!(%account_id, "sweep lost the race, retrying next pass");
      }
      // Deleted since listing; nothing left to refresh.
      Err(StoreError::NotFound(_)) => {}
      Err(e) => return Err(e),
    }
  }

  Ok(stats)
}

/// Drive [`sweep_once`] forever on a fixed interval.
pub async fn run<S, C>(
  store: Arc<S>,
  clock: Arc<C>,
  interval: Duration,
  batch: usize,
) where
  S: PolicyStore,
  C: Clock,
{
  let mut ticker = tokio::time::interval(interval);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

  loop {
    ticker.tick().await;
    match sweep_once(store.as_ref(), clock.now(), batch).await {
      Ok(stats) if stats.scanned > 0 => {
        tracing::info!(
          scanned = stats.scanned,
          refreshed = stats.refreshed,
          conflicts = stats.conflicts,
          "sweep pass complete"
        );
      }
      Ok(_) => {}
      Err(e) => tracing::warn!(error = %e, "sweep pass failed"),
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
