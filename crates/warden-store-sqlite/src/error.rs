//! Error type for `warden-store-sqlite`.
//!
//! The interface-level failures (not-found, already-exists, conflict) are
//! expressed through [`warden_core::StoreError`]; this enum covers the
//! backend's own failure modes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The full store result type: interface failures over backend failures.
pub type StoreResult<T> = std::result::Result<T, warden_core::StoreError<Error>>;
