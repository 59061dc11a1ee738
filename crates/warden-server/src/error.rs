//! HTTP mapping for [`WardenError`].

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;
use warden_core::error::WardenError;

/// Handler error: a [`WardenError`] rendered as a status code and a
/// `{code, message}` body.
#[derive(Debug)]
pub struct ApiError(pub WardenError);

impl From<WardenError> for ApiError {
    fn from(err: WardenError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &WardenError) -> StatusCode {
    match err {
        WardenError::Validation { .. } => StatusCode::BAD_REQUEST,
        WardenError::InvalidCredentials | WardenError::Unauthenticated { .. } => {
            StatusCode::UNAUTHORIZED
        }
        WardenError::Forbidden { .. } | WardenError::OriginBlocked => StatusCode::FORBIDDEN,
        WardenError::NotFound { .. } | WardenError::TargetNotFound { .. } => StatusCode::NOT_FOUND,
        WardenError::DuplicateOrigin { .. } => StatusCode::CONFLICT,
        WardenError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        WardenError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "Request failed");
        }
        (status, Json(self.0.rejection())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (WardenError::validation("bad"), 400),
            (WardenError::InvalidCredentials, 401),
            (WardenError::unauthenticated("expired"), 401),
            (WardenError::OriginBlocked, 403),
            (WardenError::forbidden("moderator"), 403),
            (WardenError::TargetNotFound { id: "t".into() }, 404),
            (WardenError::DuplicateOrigin { ip: "203.0.113.5".into() }, 409),
            (WardenError::StorageUnavailable("timeout".into()), 503),
            (WardenError::Internal("corrupt".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err).as_u16(), status, "{err}");
        }
    }

    #[test]
    fn server_errors_hide_detail() {
        let response = ApiError(WardenError::StorageUnavailable("ws://db:8000 refused".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
