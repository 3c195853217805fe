//! Scratch directory holding the upload currently being ingested

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use docrag_core::{Error, Result};

/// Single-file working area for uploads.
///
/// Each ingestion clears the directory before writing the new upload. Two
/// concurrent uploads can race on the clear; callers that need isolation must
/// serialize ingestion themselves.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove everything in the directory and recreate it empty
    pub async fn reset(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Io(e)),
        }
        fs::create_dir_all(&self.root).await?;
        debug!(path = %self.root.display(), "scratch directory reset");
        Ok(())
    }

    /// Write an upload under its own file name and return the stored path.
    ///
    /// Only the final component of `file_name` is used, so client-supplied
    /// names cannot escape the directory.
    pub async fn persist(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                Error::InvalidInput(format!("invalid upload file name: {:?}", file_name))
            })?;

        fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        fs::write(&path, bytes).await?;
        Ok(path)
    }
}
