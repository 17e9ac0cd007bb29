use super::DocumentSink;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::export::ExportedDocument;

/// Writes exports into a directory as `{timestamp}_{file_name}`.
#[derive(Debug, Clone)]
pub struct FileSink {
    base_path: PathBuf,
}

impl FileSink {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl DocumentSink for FileSink {
    async fn deliver(&self, document: &ExportedDocument) -> std::io::Result<PathBuf> {
        let timestamp = Utc::now();
        let file_name = Path::new(&document.file_name)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "export".to_string());
        let filename = format!("{}_{}", timestamp.format("%Y%m%d_%H%M%S"), file_name);
        let file_path = self.base_path.join(filename);

        fs::create_dir_all(&self.base_path).await?;

        let mut file = fs::File::create(&file_path).await?;
        file.write_all(&document.bytes).await?;
        file.flush().await?;

        info!(path = %file_path.display(), bytes = document.bytes.len(), "Export saved");
        Ok(file_path)
    }
}
