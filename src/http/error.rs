//! Mapping of domain errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::rules::{RuleError, StoreError};

/// JSON body used for every plain status reply.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Errors returned by the rule API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid rule index {0}")]
    InvalidIndex(i64),

    #[error("invalid rule at position {index}: {source}")]
    InvalidRuleBody {
        index: usize,
        #[source]
        source: RuleError,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::ConfigRead { .. } | StoreError::ConfigWrite { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Store(StoreError::IndexOutOfRange { .. } | StoreError::InvalidRule(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidIndex(_) | ApiError::InvalidRuleBody { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Rule operation failed");
        } else {
            tracing::debug!(error = %self, "Rejected rule request");
        }
        (status, MessageBody::new(self.to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        let write = ApiError::Store(StoreError::ConfigWrite {
            path: PathBuf::from("/etc/nat.conf"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert_eq!(write.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let index = ApiError::Store(StoreError::IndexOutOfRange { index: 5, len: 2 });
        assert_eq!(index.status(), StatusCode::BAD_REQUEST);

        assert_eq!(ApiError::InvalidIndex(-1).status(), StatusCode::BAD_REQUEST);
    }
}
