use anyhow::{Context, Result};
use tokio::fs;

use crate::config::Config;

pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    for dir in [cfg.speech_dir(), cfg.downloads_dir(), cfg.playlists_dir()] {
        if fs::metadata(&dir).await.is_err() {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create dir {}", dir.display()))?;
            tracing::info!("[INFO] Created directory: {}", dir.display());
        }
    }
    Ok(())
}
