//! JSON REST API for Warden.
//!
//! Exposes an axum [`Router`] backed by any [`warden_core::store::PolicyStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", warden_api::api_router(store.clone(), clock.clone()))
//! ```

pub mod accounts;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use warden_core::store::{Clock, PolicyStore};

pub use error::ApiError;

/// Shared handler state: the policy store plus the injected clock.
pub struct ApiState<S, C> {
  pub store: Arc<S>,
  pub clock: Arc<C>,
}

// Manual impl: `#[derive(Clone)]` would demand `S: Clone, C: Clone`.
impl<S, C> Clone for ApiState<S, C> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
      clock: self.clock.clone(),
    }
  }
}

/// Build a fully-materialised API router for `store` and `clock`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(store: Arc<S>, clock: Arc<C>) -> Router<()>
where
  S: PolicyStore + 'static,
  C: Clock + 'static,
{
  Router::new()
    // Creation and reads
    .route("/accounts", post(accounts::create::<S, C>))
    .route("/accounts/{id}/status", get(accounts::status::<S, C>))
    .route("/accounts/{id}/check", get(accounts::check::<S, C>))
    // Disablement
    .route("/accounts/{id}/reenable", post(accounts::reenable::<S, C>))
    .route("/accounts/{id}/disable", post(accounts::disable::<S, C>))
    .route(
      "/accounts/{id}/disable-temporarily",
      post(accounts::disable_temporarily::<S, C>),
    )
    // Validity period
    .route(
      "/accounts/{id}/valid-period",
      put(accounts::set_valid_period::<S, C>),
    )
    // Scheduled deletion
    .route("/accounts/{id}/deactivate", post(accounts::deactivate::<S, C>))
    .route(
      "/accounts/{id}/schedule-deletion",
      post(accounts::schedule_deletion::<S, C>),
    )
    .route(
      "/accounts/{id}/unschedule-deletion",
      post(accounts::unschedule_deletion::<S, C>),
    )
    // Anonymization
    .route("/accounts/{id}/anonymize", post(accounts::anonymize::<S, C>))
    .route(
      "/accounts/{id}/schedule-anonymization",
      post(accounts::schedule_anonymization::<S, C>),
    )
    .route(
      "/accounts/{id}/unschedule-anonymization",
      post(accounts::unschedule_anonymization::<S, C>),
    )
    .with_state(ApiState { store, clock })
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{DateTime, TimeZone, Utc};
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;
  use warden_store_sqlite::SqliteStore;

  /// Deterministic clock pinned to `t(2)`.
  struct FixedClock(DateTime<Utc>);

  impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> { self.0 }
  }

  fn t(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
  }

  async fn router() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store), Arc::new(FixedClock(t(2))))
  }

  async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let req = builder.body(body).unwrap();
    router.clone().oneshot(req).await.unwrap()
  }

  async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn create_account(router: &Router) -> Uuid {
    let resp = send(router, "POST", "/accounts", Some(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    body["account_id"].as_str().unwrap().parse().unwrap()
  }

  // ── Creation and reads ───────────────────────────────────────────────────

  #[tokio::test]
  async fn create_returns_normal_snapshot() {
    let router = router().await;
    let resp = send(&router, "POST", "/accounts", Some(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = body_json(resp).await;
    assert_eq!(body["status"], "normal");
    assert_eq!(body["is_disabled"], false);
    assert_eq!(body["version"], 1);
  }

  #[tokio::test]
  async fn create_twice_conflicts() {
    let router = router().await;
    let id = Uuid::new_v4();
    let body = json!({ "account_id": id });

    let resp = send(&router, "POST", "/accounts", Some(body.clone())).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&router, "POST", "/accounts", Some(body)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn status_of_missing_account_is_404() {
    let router = router().await;
    let resp = send(
      &router,
      "GET",
      &format!("/accounts/{}/status", Uuid::new_v4()),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn check_fresh_account_returns_204() {
    let router = router().await;
    let id = create_account(&router).await;
    let resp = send(&router, "GET", &format!("/accounts/{id}/check"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  }

  // ── Disablement ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn disable_then_check_returns_403() {
    let router = router().await;
    let id = create_account(&router).await;

    let resp = send(
      &router,
      "POST",
      &format!("/accounts/{id}/disable"),
      Some(json!({ "reason": "abuse" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "disabled");
    assert_eq!(body["is_disabled"], true);
    assert_eq!(body["version"], 2);

    let resp = send(&router, "GET", &format!("/accounts/{id}/check"), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "user is disabled");
    assert_eq!(body["status"], "disabled");
  }

  #[tokio::test]
  async fn disable_reenable_round_trip() {
    let router = router().await;
    let id = create_account(&router).await;

    send(
      &router,
      "POST",
      &format!("/accounts/{id}/disable"),
      Some(json!({})),
    )
    .await;

    let resp =
      send(&router, "POST", &format!("/accounts/{id}/reenable"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "normal");

    let resp = send(&router, "GET", &format!("/accounts/{id}/check"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  }

  #[tokio::test]
  async fn reenable_from_normal_is_rejected() {
    let router = router().await;
    let id = create_account(&router).await;

    let resp =
      send(&router, "POST", &format!("/accounts/{id}/reenable"), None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(
      body["error"],
      "invalid account status transition: normal -> normal"
    );
  }

  #[tokio::test]
  async fn disable_temporarily_with_active_window() {
    let router = router().await;
    let id = create_account(&router).await;

    let resp = send(
      &router,
      "POST",
      &format!("/accounts/{id}/disable-temporarily"),
      Some(json!({ "from": t(1), "until": t(3), "reason": "maintenance" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "disabled_temporarily");
    // The cache flips when the window closes.
    assert_eq!(body["stale_from"], json!(t(3)));
  }

  #[tokio::test]
  async fn disable_temporarily_rejects_inverted_window() {
    let router = router().await;
    let id = create_account(&router).await;

    let resp = send(
      &router,
      "POST",
      &format!("/accounts/{id}/disable-temporarily"),
      Some(json!({ "from": t(3), "until": t(1) })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(
      body["error"],
      "temporarily_disabled_from must be before temporarily_disabled_until"
    );
  }

  // ── Validity period ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn valid_period_outside_now_disables_account() {
    let router = router().await;
    let id = create_account(&router).await;

    let resp = send(
      &router,
      "PUT",
      &format!("/accounts/{id}/valid-period"),
      Some(json!({ "from": t(3), "until": t(4) })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "outside_valid_period");

    let resp = send(&router, "GET", &format!("/accounts/{id}/check"), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "user is outside valid period");
  }

  // ── Scheduled deletion ───────────────────────────────────────────────────

  #[tokio::test]
  async fn deactivate_then_reschedule_is_rejected() {
    let router = router().await;
    let id = create_account(&router).await;

    let resp = send(
      &router,
      "POST",
      &format!("/accounts/{id}/deactivate"),
      Some(json!({ "delete_at": t(4) })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "scheduled_deletion_deactivated");

    // Re-scheduling an already scheduled deletion is nonsensical.
    let resp = send(
      &router,
      "POST",
      &format!("/accounts/{id}/schedule-deletion"),
      Some(json!({ "delete_at": t(3) })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unschedule_deletion_restores_normal() {
    let router = router().await;
    let id = create_account(&router).await;

    send(
      &router,
      "POST",
      &format!("/accounts/{id}/schedule-deletion"),
      Some(json!({ "delete_at": t(4) })),
    )
    .await;

    let resp = send(
      &router,
      "POST",
      &format!("/accounts/{id}/unschedule-deletion"),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "normal");
  }

  // ── Anonymization ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn anonymize_is_terminal_for_validity_changes() {
    let router = router().await;
    let id = create_account(&router).await;

    let resp =
      send(&router, "POST", &format!("/accounts/{id}/anonymize"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "anonymized");
    assert_eq!(body["policy"]["anonymized_at"], json!(t(2)));

    let resp = send(
      &router,
      "PUT",
      &format!("/accounts/{id}/valid-period"),
      Some(json!({ "from": t(0), "until": t(4) })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(
      body["error"],
      "invalid account status transition: anonymized -> anonymized"
    );
  }

  #[tokio::test]
  async fn schedule_and_unschedule_anonymization() {
    let router = router().await;
    let id = create_account(&router).await;

    let resp = send(
      &router,
      "POST",
      &format!("/accounts/{id}/schedule-anonymization"),
      Some(json!({ "anonymize_at": t(4) })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "scheduled_anonymization_disabled");

    let resp = send(&router, "GET", &format!("/accounts/{id}/check"), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "user is scheduled for anonymization");

    let resp = send(
      &router,
      "POST",
      &format!("/accounts/{id}/unschedule-anonymization"),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "normal");
  }
}
