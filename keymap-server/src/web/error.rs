//! Mapping of domain errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::registry::RegistryError;
use crate::slack::SlackError;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Slack(#[from] SlackError),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("slack integration is not configured")]
    SlackDisabled,
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Registry(RegistryError::BadRequest(_)) | ApiError::MissingField(_) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            ApiError::Registry(RegistryError::NotFound) | ApiError::SlackDisabled => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::Registry(RegistryError::Storage(_) | RegistryError::KeyExhausted(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "error")
            }
            ApiError::Slack(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, status) = self.status();

        if code.is_server_error() {
            error!(error = %self, status_code = code.as_u16(), "request_failed");
        } else {
            warn!(error = %self, status_code = code.as_u16(), "request_rejected");
        }

        (
            code,
            Json(ErrorResponse {
                status: status.to_string(),
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(RegistryError::BadRequest("flow_id")), 400),
            (ApiError::from(RegistryError::NotFound), 404),
            (ApiError::from(RegistryError::Storage(sqlx::Error::PoolTimedOut)), 500),
            (ApiError::from(RegistryError::KeyExhausted(3)), 500),
            (ApiError::from(SlackError::Api("invalid_code".to_string())), 502),
            (ApiError::MissingField("code"), 400),
            (ApiError::SlackDisabled, 404),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status().as_u16(), expected);
        }
    }
}
