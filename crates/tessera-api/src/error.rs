//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tessera_core::ErrorKind;
use thiserror::Error;

/// An error returned by an API handler. Every failure originates in the
/// store, so this wraps the domain error and only decides the status code.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub tessera_core::Error);

impl ApiError {
  pub fn kind(&self) -> ErrorKind { self.0.kind() }

  pub fn status(&self) -> StatusCode {
    match self.kind() {
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::Conflict | ErrorKind::RestrictedDelete => StatusCode::CONFLICT,
      ErrorKind::InvalidArgument
      | ErrorKind::InvalidIdentifier
      | ErrorKind::InvalidColumnType
      | ErrorKind::UnknownSemanticType => StatusCode::BAD_REQUEST,
      ErrorKind::AlterFailed => StatusCode::UNPROCESSABLE_ENTITY,
      ErrorKind::IntegrityViolation | ErrorKind::Store => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = json!({ "error": self.to_string(), "kind": self.kind() });
    (self.status(), Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use tessera_core::{EntityId, Error};

  use super::*;

  #[test]
  fn kinds_map_to_statuses() {
    let cases = [
      (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
      (Error::RestrictedDelete(EntityId(1)), StatusCode::CONFLICT),
      (Error::InvalidIdentifier("a b".into()), StatusCode::BAD_REQUEST),
      (Error::IntegrityViolation("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).status(), status);
    }
  }
}
