use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ValidationError;
use crate::models::UploadFile;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".pdf", ".docx", ".txt"];

/// A single setting read from the environment, falling back to a `.env` file.
pub trait EnvSetting {
    /// The environment variable holding this setting
    const KEY_NAME: &'static str;

    /// Look the value up, loading `.env` first (silently skipped when absent)
    fn find() -> Option<String> {
        let _ = dotenvy::dotenv();
        env::var(Self::KEY_NAME).ok().filter(|value| !value.trim().is_empty())
    }
}

pub struct ApiUrl;
impl EnvSetting for ApiUrl {
    const KEY_NAME: &'static str = "QUIZGEN_API_URL";
}

pub struct RequestTimeout;
impl EnvSetting for RequestTimeout {
    const KEY_NAME: &'static str = "QUIZGEN_TIMEOUT_SECS";
}

pub struct MaxUploadMb;
impl EnvSetting for MaxUploadMb {
    const KEY_NAME: &'static str = "QUIZGEN_MAX_UPLOAD_MB";
}

pub struct ExportDir;
impl EnvSetting for ExportDir {
    const KEY_NAME: &'static str = "QUIZGEN_EXPORT_DIR";
}

/// `mb` mebibytes in bytes; `None` when that does not fit in a `u64`.
fn megabytes(mb: u64) -> Option<u64> {
    mb.checked_mul(1024 * 1024)
}

/// What the client accepts for upload before contacting the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub allowed_extensions: Vec<String>,
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            max_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl UploadPolicy {
    pub fn validate(&self, file: &UploadFile) -> Result<(), ValidationError> {
        let extension = file.extension();
        if !self.allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&extension)) {
            return Err(ValidationError::UnsupportedFileType { extension });
        }
        if file.size() > self.max_bytes {
            return Err(ValidationError::FileTooLarge { size: file.size(), max: self.max_bytes });
        }
        if file.size() == 0 {
            return Err(ValidationError::EmptyFile);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub upload: UploadPolicy,
    pub export_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            upload: UploadPolicy::default(),
            export_dir: PathBuf::from("exports"),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = ApiUrl::find() {
            config.base_url = url;
        }
        if let Some(secs) = RequestTimeout::find() {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("Failed to parse {}", RequestTimeout::KEY_NAME))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(mb) = MaxUploadMb::find() {
            let mb: u64 = mb
                .trim()
                .parse()
                .with_context(|| format!("Failed to parse {}", MaxUploadMb::KEY_NAME))?;
            config.upload.max_bytes = megabytes(mb)
                .with_context(|| format!("{} is too large: {} MB", MaxUploadMb::KEY_NAME, mb))?;
        }
        if let Some(dir) = ExportDir::find() {
            config.export_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// `base_url` joined with `path`, without doubled slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
