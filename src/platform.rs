use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{StudioError, StudioResult};

const SERVICE: &str = "clipboard";
const NO_ARGS: &[&str] = &[];
const XCLIP_ARGS: &[&str] = &["-selection", "clipboard"];

#[async_trait::async_trait]
pub trait Clipboard: Send + Sync {
    async fn copy_text(&self, text: &str) -> StudioResult<()>;
}

/// Copies through the platform's command line clipboard tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

fn copy_command() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "windows") {
        ("clip", NO_ARGS)
    } else if cfg!(target_os = "macos") {
        ("pbcopy", NO_ARGS)
    } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        ("wl-copy", NO_ARGS)
    } else {
        ("xclip", XCLIP_ARGS)
    }
}

#[async_trait::async_trait]
impl Clipboard for SystemClipboard {
    async fn copy_text(&self, text: &str) -> StudioResult<()> {
        let (program, args) = copy_command();
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| StudioError::collaborator(SERVICE, format!("{}: {}", program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| StudioError::collaborator(SERVICE, e))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| StudioError::collaborator(SERVICE, e))?;
        if !status.success() {
            return Err(StudioError::collaborator(
                SERVICE,
                format!("{} exited with {}", program, status),
            ));
        }
        Ok(())
    }
}
