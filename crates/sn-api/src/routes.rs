//! API routes
//!
//! The upload endpoint is registered with and without a trailing slash;
//! both forms are used by editor integrations in the wild.

use axum::{
    extract::DefaultBodyLimit,
    routing::{post, MethodRouter},
    Router,
};

use crate::extractors::AppState;
use crate::handlers;

/// Create the API router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summernote/upload_attachment", upload_route())
        .route("/summernote/upload_attachment/", upload_route())
        // The per-file ceiling is enforced in the save pass; the framework
        // default body limit must not reject requests before that check.
        .layer(DefaultBodyLimit::disable())
}

fn upload_route() -> MethodRouter<AppState> {
    post(handlers::upload_attachment).fallback(handlers::only_post)
}
