use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::proxy::upstream::RemoteError;

/// Message returned whenever a request arrives without a usable bearer credential.
pub const MISSING_CREDENTIAL_MESSAGE: &str = "access token not found; check your settings";

/// The forwarding operations, each with its own error policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchPosts,
    FetchInsights,
    FetchLikes,
    FetchReplies,
    DeletePost,
    Publish,
    Reply,
    FetchUser,
    FetchLimits,
    ContainerStatus,
    Analytics,
    SaveSettings,
}

impl Operation {
    /// Returned on a local fault, where no remote message exists.
    pub fn generic_message(self) -> &'static str {
        match self {
            Operation::FetchPosts => "failed to fetch posts",
            Operation::FetchInsights => "failed to fetch insights",
            Operation::FetchLikes => "failed to fetch likes",
            Operation::FetchReplies => "failed to fetch replies",
            Operation::DeletePost => "failed to delete post",
            Operation::Publish => "failed to publish post",
            Operation::Reply => "failed to reply",
            Operation::FetchUser => "failed to fetch user information",
            Operation::FetchLimits => "failed to fetch publishing limits",
            Operation::ContainerStatus => "failed to fetch container status",
            Operation::Analytics => "failed to load analytics",
            Operation::SaveSettings => "failed to save settings",
        }
    }

    /// Whether a remote rejection keeps the remote status instead of becoming a 500.
    pub fn mirrors_remote_status(self) -> bool {
        matches!(self, Operation::FetchInsights | Operation::FetchLikes)
    }

    /// Collection field included, empty, in error bodies so the dashboard can render them as-is.
    pub fn empty_collection(self) -> Option<&'static str> {
        match self {
            Operation::FetchInsights => Some("data"),
            Operation::FetchLikes => Some("likes"),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing credential")]
    MissingCredential,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{operation:?} failed ({status}): {message}")]
    Forward {
        operation: Operation,
        status: StatusCode,
        message: String,
    },

    /// Only the connectivity test reports failures as `{ error, details }`.
    #[error("connection test failed ({status}): {details}")]
    ConnectionFailed { status: StatusCode, details: String },
}

impl AppError {
    /// Apply `operation`'s policy to a failed upstream call.
    pub fn remote(operation: Operation, err: RemoteError) -> Self {
        match err {
            RemoteError::Rejected { status, message } => {
                let status = if operation.mirrors_remote_status() {
                    status
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                AppError::Forward {
                    operation,
                    status,
                    message,
                }
            }
            RemoteError::InvalidId(id) => AppError::InvalidRequest(format!("invalid id '{}'", id)),
            other => AppError::local(operation, other),
        }
    }

    /// A request refused before any remote call, reported under the operation's 500 policy
    /// with the reason as the message.
    pub fn rejected_locally(operation: Operation, reason: impl Into<String>) -> Self {
        let message = reason.into();
        tracing::warn!(?operation, "request not forwarded: {}", message);
        AppError::Forward {
            operation,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }

    /// Something went wrong on our side of the exchange: always 500 with the generic message.
    pub fn local(operation: Operation, err: impl std::fmt::Display) -> Self {
        tracing::error!(?operation, "local fault while forwarding: {}", err);
        AppError::Forward {
            operation,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: operation.generic_message().to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingCredential => StatusCode::UNAUTHORIZED,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forward { status, .. } => *status,
            AppError::ConnectionFailed { status, .. } => *status,
        }
    }
}

/// Maps upstream results through an operation's error policy.
pub trait ForwardExt<T> {
    fn forwarding(self, operation: Operation) -> Result<T, AppError>;
}

impl<T> ForwardExt<T> for Result<T, RemoteError> {
    fn forwarding(self, operation: Operation) -> Result<T, AppError> {
        self.map_err(|e| AppError::remote(operation, e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = Map::new();

        match self {
            AppError::MissingCredential => {
                body.insert("error".into(), json!(MISSING_CREDENTIAL_MESSAGE));
            }
            AppError::InvalidRequest(msg) => {
                body.insert("error".into(), json!(msg));
            }
            AppError::Forward {
                operation, message, ..
            } => {
                body.insert("error".into(), json!(message));
                if let Some(field) = operation.empty_collection() {
                    body.insert(field.into(), json!([]));
                }
            }
            AppError::ConnectionFailed { details, .. } => {
                body.insert("error".into(), json!("failed to connect to the Threads API"));
                body.insert("details".into(), json!(details));
            }
        }

        (status, Json(Value::Object(body))).into_response()
    }
}
