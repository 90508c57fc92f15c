//! # sn-api
//!
//! HTTP surface for the Summernote RS attachment endpoint.
//!
//! Exposes a single multipart upload route plus the fixed rejection for
//! read-only verbs, rendering results in the wire format the editor
//! widget consumes.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::{AppState, Caller};
pub use routes::router;
