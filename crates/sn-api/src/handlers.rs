//! Attachment upload handlers

use std::collections::HashMap;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use sn_attachments::{Attachment, UploadRequest, UploadedFile};

use crate::error::{ApiError, ApiResult, FailureBody};
use crate::extractors::{AppState, Caller};

/// Multipart field name carrying uploaded files
const FILES_FIELD: &str = "files";

/// Handle `POST /summernote/upload_attachment/`
pub async fn upload_attachment(
    State(state): State<AppState>,
    caller: Caller,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut files = Vec::new();
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid upload body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILES_FIELD {
            let filename = field.file_name().unwrap_or("unnamed").to_string();
            let content_type = field.content_type().map(|ct| ct.to_string());
            let data = field.bytes().await.map_err(|e| {
                ApiError::bad_request(format!("Invalid upload body: {}", e))
            })?;
            files.push(UploadedFile::new(filename, content_type, data));
        } else if !name.is_empty() {
            let value = field.text().await.unwrap_or_default();
            fields.insert(name, value);
        }
    }

    debug!(caller = %caller.label, files = files.len(), "Upload request received");

    let mut request = UploadRequest::new(files, fields);
    if caller.authenticated {
        request = request.authenticated_as(caller.label);
    }

    let attachments = state.upload_service.handle_upload(request).await?;

    Ok(Json(UploadSuccess::new(attachments)))
}

/// Fixed response for any verb other than POST on the upload endpoint
pub async fn only_post() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(FailureBody::new("Only POST method is allowed")),
    )
}

/// Success body in the widget's wire format
#[derive(Serialize)]
pub struct UploadSuccess {
    pub status: &'static str,
    pub files: Vec<AttachmentPayload>,
}

impl UploadSuccess {
    fn new(attachments: Vec<Attachment>) -> Self {
        Self {
            status: "true",
            files: attachments.into_iter().map(AttachmentPayload::from).collect(),
        }
    }
}

/// One saved attachment as reported to the widget
#[derive(Serialize)]
pub struct AttachmentPayload {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    pub url: String,
}

impl From<Attachment> for AttachmentPayload {
    fn from(attachment: Attachment) -> Self {
        Self {
            id: attachment.id,
            name: attachment.name,
            size: attachment.size,
            url: attachment.url,
        }
    }
}
