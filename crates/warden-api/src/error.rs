//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use warden_core::error::StoreError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a store failure onto the HTTP taxonomy. Optimistic-concurrency
  /// conflicts surface as 409 so the client retries its whole
  /// read-evaluate-write cycle.
  pub fn from_store<E>(err: StoreError<E>) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match err {
      StoreError::NotFound(id) => Self::NotFound(format!("account {id}")),
      StoreError::AlreadyExists(id) => {
        Self::Conflict(format!("account {id} already has a policy row"))
      }
      StoreError::Conflict(id) => {
        Self::Conflict(format!("account {id} was concurrently modified"))
      }
      StoreError::Backend(e) => Self::Store(Box::new(e)),
    }
  }
}

/// Transition-legality and window-consistency rejections are client errors;
/// the message is surfaced verbatim.
impl From<warden_core::Error> for ApiError {
  fn from(err: warden_core::Error) -> Self {
    Self::BadRequest(err.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
