//! # sn-core
//!
//! Configuration types shared across the Summernote RS crates.
//!
//! The editor integration is driven entirely by a process-wide, read-only
//! [`AppConfig`] value constructed once at startup and passed explicitly
//! into the handlers. There is no hidden global state.

pub mod config;

pub use config::{AppConfig, AttachmentSettings, ConfigError, ServerConfig};
