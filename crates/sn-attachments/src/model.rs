//! Attachment model
//!
//! Types flowing through the upload pipeline: the incoming request with
//! its files and auxiliary form fields, and the persisted attachment
//! record.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Form field carrying the transport token, stripped before saving.
pub const TRANSPORT_TOKEN_FIELD: &str = "csrfmiddlewaretoken";

/// A single file from a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as declared by the client
    pub filename: String,
    /// Content type as declared by the client, if any
    pub content_type: Option<String>,
    /// Raw file bytes
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data: data.into(),
        }
    }

    /// File size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Declared content type, falling back to a guess from the filename
    pub fn effective_content_type(&self) -> String {
        match &self.content_type {
            Some(ct) if !ct.is_empty() => ct.clone(),
            _ => mime_guess::from_path(&self.filename)
                .first_or_octet_stream()
                .to_string(),
        }
    }
}

/// A parsed multi-file upload request
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Files in the order they appeared in the request body
    pub files: Vec<UploadedFile>,
    /// Auxiliary form fields, transport token already stripped
    pub fields: HashMap<String, String>,
    /// Whether the caller is authenticated
    pub authenticated: bool,
    /// Caller identity for logging ("anonymous" when unauthenticated)
    pub actor: String,
}

impl UploadRequest {
    pub fn new(files: Vec<UploadedFile>, mut fields: HashMap<String, String>) -> Self {
        fields.remove(TRANSPORT_TOKEN_FIELD);
        Self {
            files,
            fields,
            authenticated: false,
            actor: "anonymous".to_string(),
        }
    }

    /// Mark the request as coming from an authenticated caller
    pub fn authenticated_as(mut self, actor: impl Into<String>) -> Self {
        self.authenticated = true;
        self.actor = actor.into();
        self
    }
}

/// A persisted attachment
///
/// Created only for files that passed type and size validation, after the
/// whole request was authorized. Never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Identifier assigned by the storage collaborator
    pub id: Uuid,
    /// Original filename
    pub name: String,
    /// Filename on disk/storage
    pub disk_filename: String,
    /// File size in bytes
    pub size: u64,
    /// MIME content type
    pub content_type: String,
    /// SHA-256 digest of the stored bytes
    pub digest: String,
    /// Public URL, relative or absolute depending on configuration
    pub url: String,
    /// Auxiliary form fields present at save time
    pub fields: HashMap<String, String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_content_type_prefers_declared() {
        let file = UploadedFile::new("photo.png", Some("image/webp".to_string()), "bytes");
        assert_eq!(file.effective_content_type(), "image/webp");
    }

    #[test]
    fn test_effective_content_type_guesses_from_filename() {
        let file = UploadedFile::new("photo.png", None, "bytes");
        assert_eq!(file.effective_content_type(), "image/png");

        let unknown = UploadedFile::new("blob", None, "bytes");
        assert_eq!(unknown.effective_content_type(), "application/octet-stream");
    }

    #[test]
    fn test_upload_request_strips_transport_token() {
        let mut fields = HashMap::new();
        fields.insert(TRANSPORT_TOKEN_FIELD.to_string(), "token".to_string());
        fields.insert("title".to_string(), "holiday".to_string());

        let request = UploadRequest::new(vec![], fields);
        assert!(!request.fields.contains_key(TRANSPORT_TOKEN_FIELD));
        assert_eq!(request.fields.get("title").map(String::as_str), Some("holiday"));
    }

    #[test]
    fn test_authenticated_as() {
        let request = UploadRequest::new(vec![], HashMap::new()).authenticated_as("alice");
        assert!(request.authenticated);
        assert_eq!(request.actor, "alice");
    }
}
