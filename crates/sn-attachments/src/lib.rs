//! # sn-attachments
//!
//! Attachment upload handling for Summernote RS.
//!
//! ## Features
//!
//! - Storage collaborator abstraction (local filesystem, in-memory)
//! - Linear upload pipeline: feature gate, authorization, type and size
//!   validation, save pass
//! - Injectable authorization policy and content-type allowlist
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sn_attachments::{DiskAttachmentStore, UploadRequest, UploadService};
//! use sn_core::AttachmentSettings;
//!
//! let store = Arc::new(DiskAttachmentStore::temp()?);
//! let service = UploadService::new(store, AttachmentSettings::default(), "http://localhost:8080");
//!
//! let attachments = service.handle_upload(request).await?;
//! ```

pub mod model;
pub mod service;
pub mod storage;

pub use model::{Attachment, UploadRequest, UploadedFile, TRANSPORT_TOKEN_FIELD};
pub use service::{
    AllowAll, AllowedImageTypes, UploadError, UploadPolicy, UploadResult, UploadService,
};
pub use storage::{
    generate_disk_filename, AttachmentStore, DiskAttachmentStore, MemoryAttachmentStore,
    StorageError, StorageResult,
};
