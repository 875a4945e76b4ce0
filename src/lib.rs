pub mod api;
pub mod config;
pub mod error;
pub mod init;
pub mod media;
pub mod notify;
pub mod orchestrator;
pub mod platform;
pub mod playlist;
pub mod request;
pub mod selection;
pub mod speech;
pub mod upload;

pub use error::{StudioError, StudioResult};
pub use media::{CandidateId, FoundClip, MediaCatalog, UploadedClip, VideoCandidate};
pub use orchestrator::{Orchestrator, PendingRequest, StudioState};
pub use request::{RequestStatus, ScriptRequest, VideoSearchRequest};
pub use selection::SelectionSet;
pub use speech::{SpeechEngine, SpeechOptions, SpeechState};

pub(crate) fn logv(tag: &str, message: &str) {
    match tag {
        "WARN" => tracing::warn!("[{}] {}", tag, message),
        _ => tracing::info!("[{}] {}", tag, message),
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}
