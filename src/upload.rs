use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::fs;

use crate::logw;

/// A locally scoped handle to user supplied media.
///
/// The core only reads `local_url`. `release` is called exactly once, when
/// the owning `UploadedClip` is dropped.
pub trait LocalResource: Send + Sync {
    fn local_url(&self) -> &str;
    fn release(&mut self);
}

fn file_url(path: &Path) -> String {
    reqwest::Url::from_file_path(path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

/// A file the user owns, referenced in place. Releasing it only drops the
/// reference; the file itself is left alone.
pub struct LocalFile {
    local_url: String,
}

impl LocalFile {
    pub async fn open(path: &Path) -> Result<Self> {
        let path = fs::canonicalize(path)
            .await
            .with_context(|| format!("Clip not found: {}", path.display()))?;
        let meta = fs::metadata(&path).await?;
        if !meta.is_file() {
            anyhow::bail!("Clip is not a file: {}", path.display());
        }
        Ok(Self {
            local_url: file_url(&path),
        })
    }
}

impl LocalResource for LocalFile {
    fn local_url(&self) -> &str {
        &self.local_url
    }

    fn release(&mut self) {
        tracing::debug!("released {}", self.local_url);
    }
}

/// Holds private copies of uploaded files for the lifetime of a session.
#[derive(Clone)]
pub struct StagingArea {
    dir: Arc<TempDir>,
    seq: Arc<AtomicU64>,
}

impl StagingArea {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("studio-uploads-")
            .tempdir()
            .context("failed to create upload staging directory")?;
        Ok(Self {
            dir: Arc::new(dir),
            seq: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub async fn stage(&self, source: &Path) -> Result<StagedFile> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip.mp4".to_string());
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let dest = self.dir.path().join(format!("{:04}_{}", seq, name));

        fs::copy(source, &dest)
            .await
            .with_context(|| format!("Failed to stage upload {}", source.display()))?;

        Ok(StagedFile {
            local_url: file_url(&dest),
            path: dest,
            released: false,
            _dir: Arc::clone(&self.dir),
        })
    }
}

pub struct StagedFile {
    path: PathBuf,
    local_url: String,
    released: bool,
    // keeps the staging directory alive while this copy exists
    _dir: Arc<TempDir>,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalResource for StagedFile {
    fn local_url(&self) -> &str {
        &self.local_url
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = std::fs::remove_file(&self.path) {
            logw(format!("Failed to release staged clip {}: {}", self.path.display(), err));
        }
    }
}
