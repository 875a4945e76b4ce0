use std::path::Path;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::api::{ClipDownloader, VideoSearcher};
use crate::config::Config;
use crate::error::{StudioError, StudioResult};
use crate::logw;
use crate::media::FoundClip;

const SEARCH_SERVICE: &str = "video search";
const DOWNLOAD_SERVICE: &str = "clip download";

#[derive(Debug, Deserialize)]
struct SearchRoot {
    videos: Vec<SearchVideo>,
}

#[derive(Debug, Deserialize)]
struct SearchVideo {
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    link: String,
}

fn clips_from_body(raw: &str) -> StudioResult<Vec<FoundClip>> {
    let root: SearchRoot = serde_json::from_str(raw).map_err(|e| {
        StudioError::collaborator(SEARCH_SERVICE, format!("malformed response: {}", e))
    })?;

    root.videos
        .into_iter()
        .enumerate()
        .map(|(idx, video)| {
            let link = video
                .video_files
                .into_iter()
                .next()
                .map(|f| f.link)
                .filter(|l| !l.is_empty())
                .ok_or_else(|| {
                    StudioError::collaborator(
                        SEARCH_SERVICE,
                        format!("malformed response: video {} has no files", idx),
                    )
                })?;
            Ok(FoundClip {
                preview_url: link.clone(),
                download_url: link,
            })
        })
        .collect()
}

/// Client of the stock-video search proxy (`/api/search`).
pub struct StockVideoClient {
    client: Client,
    base_url: String,
}

impl StockVideoClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, &cfg.search_base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl VideoSearcher for StockVideoClient {
    async fn search(&self, query: &str) -> StudioResult<Vec<FoundClip>> {
        let url = format!("{}/api/search", self.base_url);
        let resp = self
            .client
            .get(url)
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| StudioError::collaborator(SEARCH_SERVICE, e))?;

        let status = resp.status();
        if !status.is_success() {
            logw(format!("Video search HTTP {}", status.as_u16()));
            return Err(StudioError::collaborator(
                SEARCH_SERVICE,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| StudioError::collaborator(SEARCH_SERVICE, e))?;
        clips_from_body(&raw)
    }
}

#[async_trait::async_trait]
impl ClipDownloader for StockVideoClient {
    async fn download(&self, url: &str, dest: &Path) -> StudioResult<u64> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StudioError::collaborator(DOWNLOAD_SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(StudioError::collaborator(
                DOWNLOAD_SERVICE,
                format!("HTTP {} for {}", resp.status().as_u16(), url),
            ));
        }

        let parent = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StudioError::collaborator(DOWNLOAD_SERVICE, e))?;

        // dropped (and deleted) unless the whole body arrives
        let partial = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(|e| StudioError::collaborator(DOWNLOAD_SERVICE, e))?;
        let handle = partial
            .reopen()
            .map_err(|e| StudioError::collaborator(DOWNLOAD_SERVICE, e))?;
        let mut out = fs::File::from_std(handle);

        let mut written = 0u64;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| StudioError::collaborator(DOWNLOAD_SERVICE, e))?
        {
            out.write_all(&chunk)
                .await
                .map_err(|e| StudioError::collaborator(DOWNLOAD_SERVICE, e))?;
            written += chunk.len() as u64;
        }
        out.flush()
            .await
            .map_err(|e| StudioError::collaborator(DOWNLOAD_SERVICE, e))?;
        drop(out);

        partial
            .persist(dest)
            .map_err(|e| StudioError::collaborator(DOWNLOAD_SERVICE, e.error))?;

        Ok(written)
    }
}
