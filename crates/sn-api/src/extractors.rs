//! Axum extractors for API handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use sn_attachments::UploadService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub upload_service: Arc<UploadService>,
}

impl AppState {
    pub fn new(upload_service: Arc<UploadService>) -> Self {
        Self { upload_service }
    }
}

/// The acting caller, derived from the Authorization header
///
/// Credential verification is the hosting framework's concern; the
/// presence of Basic or Bearer credentials marks the caller as
/// authenticated here.
pub struct Caller {
    pub authenticated: bool,
    pub label: String,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            label: "anonymous".to_string(),
        }
    }

    pub fn authenticated(label: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            label: label.into(),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.headers.get("authorization") {
            if let Ok(auth_str) = auth.to_str() {
                if auth_str.starts_with("Basic ") || auth_str.starts_with("Bearer ") {
                    return Ok(Caller::authenticated("api_user"));
                }
            }
        }

        Ok(Caller::anonymous())
    }
}
