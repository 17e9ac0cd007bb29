use async_trait::async_trait;
use std::fmt::Debug;
use std::path::PathBuf;

use crate::export::ExportedDocument;

/// Where a retrieved export is handed over to the user.
#[async_trait]
pub trait DocumentSink: Send + Sync + Debug {
    /// Store the document and report where it went.
    async fn deliver(&self, document: &ExportedDocument) -> std::io::Result<PathBuf>;
}

pub mod file;
pub use file::FileSink;
