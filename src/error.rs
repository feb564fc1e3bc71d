//! Request-boundary errors for the proxy routes.
//!
//! Every variant renders as `{ "success": false, "message": ... }` so the
//! widget can show one banner regardless of failure kind. Upstream detail is
//! logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::shopify::UpstreamError;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Signature missing or wrong. The message never says which check failed.
    #[error("Requisição não autorizada - assinatura inválida")]
    Auth,

    #[error("{0}")]
    Validation(String),

    #[error("Customer não encontrado")]
    NotFound,

    /// `context` is the user-facing message for the route, `source` goes to logs.
    #[error("{context}")]
    Upstream {
        context: &'static str,
        #[source]
        source: UpstreamError,
    },

    #[error("{message}")]
    NotSupported {
        message: String,
        info: Option<String>,
    },
}

impl ProxyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upstream(context: &'static str) -> impl FnOnce(UpstreamError) -> Self {
        move |source| Self::Upstream { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotSupported { .. } => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Upstream { context, source } => {
                error!("{}: {:?}", context, source);
                json!({ "success": false, "message": context })
            }
            Self::NotSupported { message, info } => {
                json!({ "success": false, "message": message, "info": info })
            }
            other => json!({ "success": false, "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
