//! Service configuration
//!
//! Only the listen address and the two working directories are configurable.
//! Pipeline tuning (duration bounds, transcode timeout, overlay geometry,
//! encoder arguments) is fixed in the modules that own it.

use std::path::PathBuf;

/// Default TCP port when neither `--port` nor `PORT` is set
pub const DEFAULT_PORT: u16 = 5000;

/// Runtime configuration for the service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to bind
    pub host: String,
    /// TCP port to listen on
    pub port: u16,
    /// Directory for uploads and transcode intermediates
    pub upload_dir: PathBuf,
    /// Directory for finished exports
    pub export_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from("uploads"),
            export_dir: PathBuf::from("exports"),
        }
    }
}

impl AppConfig {
    /// Set the bind address
    #[must_use]
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the listen port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the upload/intermediate directory
    #[must_use]
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Set the export directory
    #[must_use]
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Create both working directories if they do not exist yet
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.export_dir)
    }
}
