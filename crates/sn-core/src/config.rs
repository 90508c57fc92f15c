//! Configuration types and loading
//!
//! Settings mirror the configuration keys of the Summernote editor
//! integration: attachment feature flags, the upload size ceiling, and
//! URL absolutization.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Attachment upload settings
    pub attachments: AttachmentSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL, used when absolute attachment URLs are requested
    pub base_url: String,
}

/// Settings controlling the attachment upload endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttachmentSettings {
    /// Reject all uploads when set
    pub disable_attachment: bool,
    /// Require an authenticated caller for uploads
    pub require_authentication: bool,
    /// Per-file size ceiling in bytes
    pub filesize_limit: u64,
    /// Return absolute URLs instead of storage-relative ones
    pub absolute_uri: bool,
    /// Content types accepted by the pre-validation pass
    pub allowed_image_types: Vec<String>,
    /// Root directory for disk storage
    pub storage_path: String,
    /// Public path prefix under which stored files are served
    pub storage_url_prefix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            attachments: AttachmentSettings::default(),
        }
    }
}

impl Default for AttachmentSettings {
    fn default() -> Self {
        Self {
            disable_attachment: false,
            require_authentication: false,
            filesize_limit: 1024 * 1024, // 1 MiB
            absolute_uri: false,
            allowed_image_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
                "image/bmp".to_string(),
            ],
            storage_path: "/var/summernote/attachments".to_string(),
            storage_url_prefix: "/media/summernote".to_string(),
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not set: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("not a port number: {}", port),
            })?;
        }
        if let Ok(base) = std::env::var("SUMMERNOTE_BASE_URL") {
            config.server.base_url = base.trim_end_matches('/').to_string();
        }

        let parse_bool = |v: String| v == "true" || v == "1" || v == "yes";

        // Attachments
        if let Ok(v) = std::env::var("SUMMERNOTE_DISABLE_ATTACHMENT") {
            config.attachments.disable_attachment = parse_bool(v);
        }
        if let Ok(v) = std::env::var("SUMMERNOTE_ATTACHMENT_REQUIRE_AUTHENTICATION") {
            config.attachments.require_authentication = parse_bool(v);
        }
        if let Ok(v) = std::env::var("SUMMERNOTE_ATTACHMENT_FILESIZE_LIMIT") {
            config.attachments.filesize_limit =
                v.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "SUMMERNOTE_ATTACHMENT_FILESIZE_LIMIT".to_string(),
                    message: format!("not a byte count: {}", v),
                })?;
        }
        if let Ok(v) = std::env::var("SUMMERNOTE_ATTACHMENT_ABSOLUTE_URI") {
            config.attachments.absolute_uri = parse_bool(v);
        }
        if let Ok(types) = std::env::var("SUMMERNOTE_ALLOWED_IMAGE_TYPES") {
            config.attachments.allowed_image_types = types
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Ok(path) = std::env::var("SUMMERNOTE_STORAGE_PATH") {
            config.attachments.storage_path = path;
        }
        if let Ok(prefix) = std::env::var("SUMMERNOTE_STORAGE_URL_PREFIX") {
            config.attachments.storage_url_prefix = prefix;
        }

        Ok(config)
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> std::net::SocketAddr {
        let ip: std::net::IpAddr = self.server.host.parse().unwrap_or([0, 0, 0, 0].into());
        std::net::SocketAddr::new(ip, self.server.port)
    }
}
