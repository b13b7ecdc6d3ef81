//! Best-effort record of the last request, for operational debugging.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// File name written inside the log directory.
pub const LAST_REQUEST_FILE: &str = "last_request.json";

/// What gets recorded about the most recent call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRequest {
    /// Resolved model URI.
    pub model_uri: String,
    /// Name of the requested schema, if any.
    pub schema_name: Option<String>,
}

/// Fire-and-forget destination for [`LastRequest`] records.
///
/// Implementations swallow their own failures; a diagnostic write must never
/// fail the call it describes.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    /// Persists the record.
    async fn write_last_request(&self, record: &LastRequest);
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl DiagnosticSink for NoopSink {
    async fn write_last_request(&self, _record: &LastRequest) {}
}

/// Overwrites `<dir>/last_request.json` with pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Creates a sink writing into `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of the record file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(LAST_REQUEST_FILE)
    }

    async fn try_write(&self, record: &LastRequest) -> std::io::Result<()> {
        let body = serde_json::to_vec_pretty(record)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path(), body).await
    }
}

#[async_trait]
impl DiagnosticSink for FileSink {
    async fn write_last_request(&self, record: &LastRequest) {
        if let Err(e) = self.try_write(record).await {
            tracing::warn!(path = %self.path().display(), error = %e, "failed to write last request record");
        }
    }
}
