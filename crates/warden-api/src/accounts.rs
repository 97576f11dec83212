//! Handlers for `/accounts` endpoints.
//!
//! Every mutating handler runs the same read-evaluate-write cycle: load the
//! row, bind it to the injected clock, apply one transition-guard operation,
//! and save against the version it read. A concurrent writer surfaces as 409
//! and the client retries from the load.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use warden_core::{
  policy::Policy,
  status::{AccountStatus, StatusView},
  store::{Clock, PolicyStore, StoredPolicy},
};

use crate::{ApiState, error::ApiError};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The evaluated state returned by reads and by successful mutations.
#[derive(Debug, Serialize)]
pub struct StatusSnapshot {
  pub account_id:  Uuid,
  pub status:      AccountStatus,
  pub is_disabled: bool,
  pub stale_from:  Option<DateTime<Utc>>,
  pub as_of:       DateTime<Utc>,
  pub version:     i64,
  pub policy:      Policy,
}

impl StatusSnapshot {
  fn of(row: StoredPolicy, as_of: DateTime<Utc>) -> Self {
    let view = row.policy.at(as_of);
    Self {
      account_id: row.account_id,
      status: view.status(),
      is_disabled: view.is_disabled(),
      stale_from: view.stale_from(),
      as_of,
      version: row.version,
      policy: view.policy().clone(),
    }
  }
}

/// The shared read-evaluate-apply-save cycle behind every mutation.
async fn apply<S, C, F>(
  state: &ApiState<S, C>,
  id: Uuid,
  op: F,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
  F: FnOnce(&StatusView) -> Result<Policy, warden_core::Error>,
{
  let row = state.store.load(id).await.map_err(ApiError::from_store)?;
  let version = row.version;
  let now = state.clock.now();
  let view = row.policy.at(now);
  let policy = op(&view)?;
  let saved = state
    .store
    .save(id, &policy, version)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(StatusSnapshot::of(saved, now)))
}

// ─── Create / reads ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  /// Caller-supplied account UUID; generated when absent.
  pub account_id: Option<Uuid>,
}

/// `POST /accounts` — body: `{"account_id": "..."}` or `{}`.
pub async fn create<S, C>(
  State(state): State<ApiState<S, C>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  let account_id = body.account_id.unwrap_or_else(Uuid::new_v4);
  let row = state
    .store
    .create(account_id)
    .await
    .map_err(ApiError::from_store)?;
  let snapshot = StatusSnapshot::of(row, state.clock.now());
  Ok((StatusCode::CREATED, Json(snapshot)))
}

/// `GET /accounts/:id/status`
pub async fn status<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  let row = state.store.load(id).await.map_err(ApiError::from_store)?;
  Ok(Json(StatusSnapshot::of(row, state.clock.now())))
}

/// `GET /accounts/:id/check` — the login-path gate. 204 when the account may
/// authenticate, 403 with the lifecycle denial otherwise.
pub async fn check<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  let row = state.store.load(id).await.map_err(ApiError::from_store)?;
  let view = row.policy.at(state.clock.now());
  match view.check() {
    Ok(()) => Ok(StatusCode::NO_CONTENT.into_response()),
    Err(denial) => Ok(
      (
        StatusCode::FORBIDDEN,
        Json(json!({
          "error": denial.to_string(),
          "status": view.status().to_string(),
        })),
      )
        .into_response(),
    ),
  }
}

// ─── Disablement ─────────────────────────────────────────────────────────────

/// `POST /accounts/:id/reenable`
pub async fn reenable<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  apply(&state, id, |view| view.reenable()).await
}

#[derive(Debug, Deserialize)]
pub struct DisableBody {
  pub reason: Option<String>,
}

/// `POST /accounts/:id/disable` — body: `{"reason": "..."}` or `{}`.
pub async fn disable<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
  Json(body): Json<DisableBody>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  apply(&state, id, |view| view.disable_indefinitely(body.reason)).await
}

#[derive(Debug, Deserialize)]
pub struct DisableTemporarilyBody {
  pub from:   DateTime<Utc>,
  pub until:  DateTime<Utc>,
  pub reason: Option<String>,
}

/// `POST /accounts/:id/disable-temporarily`
pub async fn disable_temporarily<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
  Json(body): Json<DisableTemporarilyBody>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  apply(&state, id, |view| {
    view.disable_temporarily(body.from, body.until, body.reason)
  })
  .await
}

// ─── Validity period ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ValidPeriodBody {
  pub from:  Option<DateTime<Utc>>,
  pub until: Option<DateTime<Utc>>,
}

/// `PUT /accounts/:id/valid-period` — absent bounds are cleared.
pub async fn set_valid_period<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ValidPeriodBody>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  apply(&state, id, |view| {
    view.set_account_valid_period(body.from, body.until)
  })
  .await
}

// ─── Scheduled deletion ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScheduleDeletionBody {
  pub delete_at: DateTime<Utc>,
}

/// `POST /accounts/:id/deactivate` — end-user self-service deletion.
pub async fn deactivate<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ScheduleDeletionBody>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  apply(&state, id, |view| {
    view.schedule_deletion_by_end_user(body.delete_at)
  })
  .await
}

/// `POST /accounts/:id/schedule-deletion` — administrative deletion.
pub async fn schedule_deletion<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ScheduleDeletionBody>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  apply(&state, id, |view| {
    view.schedule_deletion_by_admin(body.delete_at)
  })
  .await
}

/// `POST /accounts/:id/unschedule-deletion`
pub async fn unschedule_deletion<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  apply(&state, id, |view| view.unschedule_deletion_by_admin()).await
}

// ─── Anonymization ───────────────────────────────────────────────────────────

/// `POST /accounts/:id/anonymize` — invoked by the executor (or an admin)
/// when the scheduled instant is reached.
pub async fn anonymize<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  apply(&state, id, |view| view.anonymize()).await
}

#[derive(Debug, Deserialize)]
pub struct ScheduleAnonymizationBody {
  pub anonymize_at: DateTime<Utc>,
}

/// `POST /accounts/:id/schedule-anonymization`
pub async fn schedule_anonymization<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ScheduleAnonymizationBody>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  apply(&state, id, |view| {
    view.schedule_anonymization_by_admin(body.anonymize_at)
  })
  .await
}

/// `POST /accounts/:id/unschedule-anonymization`
pub async fn unschedule_anonymization<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<StatusSnapshot>, ApiError>
where
  S: PolicyStore,
  C: Clock,
{
  apply(&state, id, |view| view.unschedule_anonymization_by_admin()).await
}
