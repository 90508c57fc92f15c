//! Upload service
//!
//! Orchestrates the attachment upload pipeline: feature gate,
//! authorization, per-file validation, and the save pass through the
//! storage collaborator.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument};
use url::Url;

use sn_core::AttachmentSettings;

use crate::model::{Attachment, UploadRequest, UploadedFile};
use crate::storage::AttachmentStore;

/// Terminal upload failures; none are retried
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Authorization predicate for the upload endpoint
///
/// Injected capability standing in for a framework permission check.
pub trait UploadPolicy: Send + Sync {
    fn allows_upload(&self, request: &UploadRequest) -> bool;
}

/// Policy that admits every request
pub struct AllowAll;

impl UploadPolicy for AllowAll {
    fn allows_upload(&self, _request: &UploadRequest) -> bool {
        true
    }
}

impl<F> UploadPolicy for F
where
    F: Fn(&UploadRequest) -> bool + Send + Sync,
{
    fn allows_upload(&self, request: &UploadRequest) -> bool {
        self(request)
    }
}

/// Content-type allowlist for the pre-validation pass
#[derive(Debug, Clone)]
pub struct AllowedImageTypes {
    types: Vec<String>,
}

impl AllowedImageTypes {
    pub fn new(types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, content_type: &str) -> bool {
        self.types.iter().any(|t| t == content_type)
    }
}

/// Attachment upload service
///
/// Holds the read-only settings and the injected collaborators. One
/// instance is shared across requests; the pipeline itself keeps no
/// mutable state.
pub struct UploadService {
    store: Arc<dyn AttachmentStore>,
    policy: Arc<dyn UploadPolicy>,
    allowed_types: AllowedImageTypes,
    settings: AttachmentSettings,
    base_url: String,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn AttachmentStore>,
        settings: AttachmentSettings,
        base_url: impl Into<String>,
    ) -> Self {
        let allowed_types = AllowedImageTypes::new(settings.allowed_image_types.clone());
        Self {
            store,
            policy: Arc::new(AllowAll),
            allowed_types,
            settings,
            base_url: base_url.into(),
        }
    }

    /// Replace the authorization policy
    pub fn with_policy(mut self, policy: Arc<dyn UploadPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the content-type allowlist
    pub fn with_allowed_types(mut self, allowed_types: AllowedImageTypes) -> Self {
        self.allowed_types = allowed_types;
        self
    }

    /// Run the upload pipeline for one request
    ///
    /// The save pass is not transactional: a file failing the size check
    /// aborts the request but leaves files saved earlier in the same pass
    /// persisted.
    #[instrument(skip(self, request), fields(actor = %request.actor, files = request.files.len()))]
    pub async fn handle_upload(&self, request: UploadRequest) -> UploadResult<Vec<Attachment>> {
        if self.settings.disable_attachment {
            error!(actor = %request.actor, "Attempt to use disabled attachment module");
            return Err(UploadError::Forbidden(
                "Attachment module is disabled".to_string(),
            ));
        }

        if !self.policy.allows_upload(&request) {
            return Err(UploadError::Forbidden(
                "You do not have permission to upload attachments".to_string(),
            ));
        }

        if self.settings.require_authentication && !request.authenticated {
            return Err(UploadError::Forbidden(
                "Only authenticated users are allowed".to_string(),
            ));
        }

        if request.files.is_empty() {
            return Err(UploadError::BadRequest("No files were requested".to_string()));
        }

        // Pre-validation pass: reject the whole request before anything is
        // persisted if any file is not an allowed image type.
        for file in &request.files {
            let content_type = file.effective_content_type();
            if !self.allowed_types.is_allowed(&content_type) {
                error!(
                    actor = %request.actor,
                    filename = %file.filename,
                    content_type = %content_type,
                    "Attempt to upload non-image file"
                );
                return Err(UploadError::BadRequest(format!(
                    "File type is not allowed: {}",
                    content_type
                )));
            }
        }

        // Save pass, in input order. Earlier saves persist if a later file
        // fails the size check.
        let mut attachments = Vec::with_capacity(request.files.len());
        for file in &request.files {
            if file.size() > self.settings.filesize_limit {
                return Err(UploadError::BadRequest(
                    "File size exceeds the limit allowed and cannot be saved".to_string(),
                ));
            }

            let mut attachment = self.save_file(file, &request).await?;
            if self.settings.absolute_uri {
                attachment.url = self.absolutize(&attachment.url);
            }

            info!(
                id = %attachment.id,
                filename = %attachment.name,
                size = attachment.size,
                "Attachment saved"
            );
            attachments.push(attachment);
        }

        Ok(attachments)
    }

    async fn save_file(
        &self,
        file: &UploadedFile,
        request: &UploadRequest,
    ) -> UploadResult<Attachment> {
        self.store
            .create(file, &request.fields)
            .await
            .map_err(|e| {
                error!(filename = %file.filename, cause = %e, "Storage failure during upload");
                UploadError::Internal("Failed to save attachment".to_string())
            })
    }

    fn absolutize(&self, relative: &str) -> String {
        match Url::parse(&self.base_url).and_then(|base| base.join(relative)) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.base_url.trim_end_matches('/'), relative),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use crate::storage::{MemoryAttachmentStore, StorageError, StorageResult};

    use super::*;

    fn png(name: &str, len: usize) -> UploadedFile {
        UploadedFile::new(name, Some("image/png".to_string()), vec![0u8; len])
    }

    fn settings() -> AttachmentSettings {
        AttachmentSettings {
            filesize_limit: 1024,
            ..AttachmentSettings::default()
        }
    }

    fn service_with(
        store: Arc<MemoryAttachmentStore>,
        settings: AttachmentSettings,
    ) -> UploadService {
        UploadService::new(store, settings, "http://example.com")
    }

    #[tokio::test]
    async fn test_empty_file_list_is_rejected() {
        let store = Arc::new(MemoryAttachmentStore::new());
        let service = service_with(store.clone(), settings());

        let result = service
            .handle_upload(UploadRequest::new(vec![], HashMap::new()))
            .await;

        assert!(matches!(result, Err(UploadError::BadRequest(_))));
        assert_eq!(store.saved_count(), 0);
    }

    #[tokio::test]
    async fn test_non_image_rejects_whole_request() {
        let store = Arc::new(MemoryAttachmentStore::new());
        let service = service_with(store.clone(), settings());

        let files = vec![
            png("ok.png", 10),
            UploadedFile::new("notes.txt", Some("text/plain".to_string()), "hello"),
        ];
        let result = service
            .handle_upload(UploadRequest::new(files, HashMap::new()))
            .await;

        match result {
            Err(UploadError::BadRequest(msg)) => assert!(msg.contains("text/plain")),
            other => panic!("expected BadRequest, got {:?}", other.map(|a| a.len())),
        }
        // The valid file must not have been persisted either.
        assert_eq!(store.saved_count(), 0);
    }

    #[tokio::test]
    async fn test_two_valid_files_succeed() {
        let store = Arc::new(MemoryAttachmentStore::new());
        let service = service_with(store.clone(), settings());

        let files = vec![png("a.png", 100), png("b.png", 200)];
        let attachments = service
            .handle_upload(UploadRequest::new(files, HashMap::new()).authenticated_as("alice"))
            .await
            .unwrap();

        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].name, "a.png");
        assert_eq!(attachments[1].name, "b.png");
        assert!(attachments.iter().all(|a| !a.url.is_empty()));
        assert_eq!(store.saved_count(), 2);
    }

    #[tokio::test]
    async fn test_oversize_file_aborts_but_earlier_saves_persist() {
        let store = Arc::new(MemoryAttachmentStore::new());
        let service = service_with(store.clone(), settings());

        let files = vec![png("small.png", 10), png("big.png", 2048)];
        let result = service
            .handle_upload(UploadRequest::new(files, HashMap::new()))
            .await;

        match result {
            Err(UploadError::BadRequest(msg)) => {
                assert_eq!(msg, "File size exceeds the limit allowed and cannot be saved")
            }
            other => panic!("expected BadRequest, got {:?}", other.map(|a| a.len())),
        }
        // Non-atomic save pass: the small file stays persisted.
        assert_eq!(store.saved_count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_module_short_circuits_before_validation() {
        let store = Arc::new(MemoryAttachmentStore::new());
        let mut settings = settings();
        settings.disable_attachment = true;
        let service = service_with(store.clone(), settings);

        // A file that would fail type validation; the disabled-module error
        // must win because no validation runs first.
        let files = vec![UploadedFile::new(
            "notes.txt",
            Some("text/plain".to_string()),
            "hello",
        )];
        let result = service
            .handle_upload(UploadRequest::new(files, HashMap::new()))
            .await;

        match result {
            Err(UploadError::Forbidden(msg)) => assert_eq!(msg, "Attachment module is disabled"),
            other => panic!("expected Forbidden, got {:?}", other.map(|a| a.len())),
        }
        assert_eq!(store.saved_count(), 0);
    }

    #[tokio::test]
    async fn test_authentication_required() {
        let store = Arc::new(MemoryAttachmentStore::new());
        let mut settings = settings();
        settings.require_authentication = true;
        let service = service_with(store.clone(), settings);

        let files = vec![png("a.png", 10)];
        let result = service
            .handle_upload(UploadRequest::new(files.clone(), HashMap::new()))
            .await;
        match result {
            Err(UploadError::Forbidden(msg)) => {
                assert_eq!(msg, "Only authenticated users are allowed")
            }
            other => panic!("expected Forbidden, got {:?}", other.map(|a| a.len())),
        }
        assert_eq!(store.saved_count(), 0);

        // The same request succeeds once authenticated.
        let attachments = service
            .handle_upload(UploadRequest::new(files, HashMap::new()).authenticated_as("alice"))
            .await
            .unwrap();
        assert_eq!(attachments.len(), 1);
    }

    #[tokio::test]
    async fn test_policy_denial() {
        let store = Arc::new(MemoryAttachmentStore::new());
        let service = service_with(store.clone(), settings())
            .with_policy(Arc::new(|_: &UploadRequest| false));

        let result = service
            .handle_upload(UploadRequest::new(vec![png("a.png", 10)], HashMap::new()))
            .await;

        assert!(matches!(result, Err(UploadError::Forbidden(_))));
        assert_eq!(store.saved_count(), 0);
    }

    #[tokio::test]
    async fn test_absolute_uri() {
        let store = Arc::new(MemoryAttachmentStore::new());
        let mut settings = settings();
        settings.absolute_uri = true;
        let service = service_with(store.clone(), settings);

        let attachments = service
            .handle_upload(UploadRequest::new(vec![png("a.png", 10)], HashMap::new()))
            .await
            .unwrap();

        assert!(attachments[0].url.starts_with("http://example.com/memory/"));
    }

    #[tokio::test]
    async fn test_fields_reach_the_store() {
        let store = Arc::new(MemoryAttachmentStore::new());
        let service = service_with(store.clone(), settings());

        let fields = HashMap::from([
            ("title".to_string(), "holiday".to_string()),
            ("csrfmiddlewaretoken".to_string(), "secret".to_string()),
        ]);
        let attachments = service
            .handle_upload(UploadRequest::new(vec![png("a.png", 10)], fields))
            .await
            .unwrap();

        assert_eq!(
            attachments[0].fields.get("title").map(String::as_str),
            Some("holiday")
        );
        assert!(!attachments[0].fields.contains_key("csrfmiddlewaretoken"));
    }

    struct FailingStore;

    #[async_trait]
    impl crate::storage::AttachmentStore for FailingStore {
        async fn create(
            &self,
            _file: &UploadedFile,
            _fields: &HashMap<String, String>,
        ) -> StorageResult<Attachment> {
            Err(StorageError::Backend("disk full".to_string()))
        }

        fn url_of(&self, attachment: &Attachment) -> String {
            attachment.url.clone()
        }
    }

    #[tokio::test]
    async fn test_storage_failure_maps_to_internal() {
        let service = UploadService::new(Arc::new(FailingStore), settings(), "http://example.com");

        let result = service
            .handle_upload(UploadRequest::new(vec![png("a.png", 10)], HashMap::new()))
            .await;

        match result {
            Err(UploadError::Internal(msg)) => {
                // The underlying cause is logged, never surfaced.
                assert_eq!(msg, "Failed to save attachment");
            }
            other => panic!("expected Internal, got {:?}", other.map(|a| a.len())),
        }
    }
}
