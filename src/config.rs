use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;

use crate::storage::{RetentionPolicy, DEFAULT_MAX_UPLOAD_BYTES};
use crate::DevicePreference;

/// Language used when a synthesis request does not name one.
pub const DEFAULT_LANGUAGE: &str = "ko";

/// Runtime configuration for the web front-end.
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Where uploaded reference clips are stored.
    pub uploads_dir: PathBuf,
    /// Where synthesized audio is written.
    pub outputs_dir: PathBuf,
    /// Where scoped temporary reference copies live. `None` uses the system temp dir.
    pub temp_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub default_language: String,
    pub device: DevicePreference,
    /// Path to the Coqui `tts` binary. `None` resolves it from PATH.
    pub tts_bin: Option<PathBuf>,
    pub model_name: String,
    pub retention: RetentionPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            uploads_dir: PathBuf::from("uploads"),
            outputs_dir: PathBuf::from("outputs"),
            temp_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            default_language: DEFAULT_LANGUAGE.to_string(),
            device: DevicePreference::Auto,
            tts_bin: None,
            model_name: "tts_models/multilingual/multi-dataset/xtts_v2".to_string(),
            retention: RetentionPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Retention windows given in whole hours.
    pub fn retention_hours(uploads: u64, outputs: u64) -> RetentionPolicy {
        RetentionPolicy {
            uploads: Duration::from_secs(uploads * 3600),
            outputs: Duration::from_secs(outputs * 3600),
        }
    }
}
