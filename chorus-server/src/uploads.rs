//! Recording uploads on local disk
//!
//! Files live in one flat directory and are served back at
//! `/uploads/<file name>`. The task record stores that public path.

use axum::body::Bytes;
use chorus_common::{Error, Result};
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// URL prefix under which the uploads directory is served
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// An uploaded file held in memory until it is stored
#[derive(Debug, Clone)]
pub struct Upload {
    /// File name as sent by the client; only its extension is kept
    pub original_name: Option<String>,
    pub bytes: Bytes,
}

/// A file written to the uploads directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecording {
    pub file_name: String,
    /// Value stored on the task, e.g. `/uploads/recording-1718000000000-42.mp3`
    pub public_path: String,
}

/// Result of a deletion that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Nothing was there to delete
    Missing,
}

/// Owns the uploads directory
#[derive(Debug, Clone)]
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the uploads directory if it doesn't exist
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Write an upload under a freshly generated name
    pub async fn save(&self, upload: &Upload) -> Result<StoredRecording> {
        let file_name = generate_file_name(upload.original_name.as_deref());
        let path = self.dir.join(&file_name);

        tokio::fs::write(&path, &upload.bytes).await?;
        info!(
            "Stored recording {} ({} bytes)",
            file_name,
            upload.bytes.len()
        );

        Ok(StoredRecording {
            public_path: format!("{}{}", PUBLIC_PREFIX, file_name),
            file_name,
        })
    }

    /// Map a stored public path back to a file inside the uploads directory
    ///
    /// Returns `None` for anything that is not a bare file name under
    /// [`PUBLIC_PREFIX`].
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let name = public_path.strip_prefix(PUBLIC_PREFIX)?;
        let is_plain_name = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        is_plain_name.then(|| self.dir.join(name))
    }

    /// Delete a stored recording
    ///
    /// A file that is already gone is reported as [`RemoveOutcome::Missing`],
    /// not as an error.
    pub async fn remove(&self, public_path: &str) -> Result<RemoveOutcome> {
        let path = self.resolve(public_path).ok_or_else(|| {
            Error::Internal(format!("Refusing to delete unexpected path '{}'", public_path))
        })?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted recording {}", path.display());
                Ok(RemoveOutcome::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RemoveOutcome::Missing),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort delete: failures are logged and otherwise ignored
    pub async fn discard(&self, public_path: &str) {
        if let Err(e) = self.remove(public_path).await {
            warn!("Failed to delete recording {}: {}", public_path, e);
        }
    }
}

/// `recording-<unix millis>-<random below 1e9><.ext>`
pub fn generate_file_name(original_name: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("recording-{}-{}{}", millis, suffix, extension)
}
