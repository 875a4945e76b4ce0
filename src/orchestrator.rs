use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::api::elevenlabs::ElevenLabsSpeech;
use crate::api::gemini::GeminiClient;
use crate::api::stock::StockVideoClient;
use crate::api::{ClipDownloader, ScriptGenerator, VideoSearcher};
use crate::config::Config;
use crate::error::{StudioError, StudioResult};
use crate::media::{CandidateId, MediaCatalog, UploadedClip};
use crate::notify::{LogNotifier, Notice, Notifier};
use crate::platform::{Clipboard, SystemClipboard};
use crate::playlist;
use crate::request::{Fence, ScriptRequest, VideoSearchRequest};
use crate::selection::SelectionSet;
use crate::speech::SpeechEngine;
use crate::upload::LocalResource;
use crate::{logi, logok};

/// Everything a subscriber can observe. Each transition is published as one
/// update.
#[derive(Debug, Default)]
pub struct StudioState {
    pub script: ScriptRequest,
    pub search: VideoSearchRequest,
    pub catalog: MediaCatalog,
    pub selection: SelectionSet,
}

impl StudioState {
    /// Chosen candidates' download URLs ascending by index, then uploaded
    /// clips in upload order.
    pub fn merge_list(&self) -> StudioResult<Vec<String>> {
        let mut list = self.selection.materialize(&self.catalog)?;
        list.extend(
            self.catalog
                .uploads()
                .iter()
                .map(|clip| clip.local_url().to_string()),
        );
        Ok(list)
    }
}

/// The external capabilities the orchestrator drives.
pub struct Collaborators {
    pub scripts: Arc<dyn ScriptGenerator>,
    pub searcher: Arc<dyn VideoSearcher>,
    pub downloader: Arc<dyn ClipDownloader>,
    pub speech: Arc<SpeechEngine>,
    pub clipboard: Arc<dyn Clipboard>,
    pub notifier: Arc<dyn Notifier>,
}

/// Handle to a spawned script or search request.
#[derive(Debug)]
pub struct PendingRequest {
    token: u64,
    handle: JoinHandle<()>,
}

impl PendingRequest {
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Waits until the request's outcome has been applied or discarded.
    pub async fn settled(self) {
        if let Err(err) = self.handle.await {
            error!("request {} task ended abnormally: {}", self.token, err);
        }
    }
}

struct Inner {
    scripts: Arc<dyn ScriptGenerator>,
    searcher: Arc<dyn VideoSearcher>,
    downloader: Arc<dyn ClipDownloader>,
    speech: Arc<SpeechEngine>,
    clipboard: Arc<dyn Clipboard>,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    state: watch::Sender<StudioState>,
    script_fence: Fence,
    search_fence: Fence,
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(collab: Collaborators, timeout: Duration) -> Self {
        let (state, _) = watch::channel(StudioState::default());
        Self {
            inner: Arc::new(Inner {
                scripts: collab.scripts,
                searcher: collab.searcher,
                downloader: collab.downloader,
                speech: collab.speech,
                clipboard: collab.clipboard,
                notifier: collab.notifier,
                timeout,
                state,
                script_fence: Fence::default(),
                search_fence: Fence::default(),
            }),
        }
    }

    /// Wires the HTTP collaborators, the system clipboard and log
    /// notifications from `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let stock = Arc::new(StockVideoClient::new(cfg)?);
        let speech = SpeechEngine::new(Arc::new(ElevenLabsSpeech::new(cfg)?), cfg.speech.clone())
            .with_timeout(cfg.request_timeout());

        Ok(Self::new(
            Collaborators {
                scripts: Arc::new(GeminiClient::new(cfg)?),
                searcher: stock.clone(),
                downloader: stock,
                speech: Arc::new(speech),
                clipboard: Arc::new(SystemClipboard),
                notifier: Arc::new(LogNotifier),
            },
            cfg.request_timeout(),
        ))
    }

    pub fn subscribe(&self) -> watch::Receiver<StudioState> {
        self.inner.state.subscribe()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&StudioState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    pub fn candidate_ids(&self) -> Vec<CandidateId> {
        self.with_state(|s| s.catalog.candidates().iter().map(|c| c.id).collect())
    }

    pub fn speech(&self) -> &Arc<SpeechEngine> {
        &self.inner.speech
    }

    pub fn generate_script(&self, prompt: impl Into<String>) -> PendingRequest {
        let prompt = prompt.into();
        let mut token = 0;
        self.inner.state.send_modify(|s| {
            token = self.inner.script_fence.next();
            s.script = ScriptRequest::pending(prompt.clone(), token);
        });
        logi(format!("Generating script #{} for \"{}\"", token, prompt));

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.finish_script(prompt, token).await });
        PendingRequest { token, handle }
    }

    pub fn search_videos(&self, query: &str) -> StudioResult<PendingRequest> {
        let query = query.trim().to_string();
        if query.is_empty() {
            let err = StudioError::validation("Please enter text to find videos");
            self.inner.report(&err);
            return Err(err);
        }

        let mut token = 0;
        self.inner.state.send_modify(|s| {
            token = self.inner.search_fence.next();
            s.search = VideoSearchRequest::pending(query.clone(), token);
        });
        logi(format!("Searching videos #{} for \"{}\"", token, query));

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.finish_search(query, token).await });
        Ok(PendingRequest { token, handle })
    }

    /// Flips the selection of a candidate of the current catalog and returns
    /// whether it is now chosen.
    pub fn toggle_selection(&self, id: CandidateId) -> StudioResult<bool> {
        let mut outcome = Err(StudioError::validation(format!(
            "Video {} is not part of the current results",
            id
        )));
        self.inner.state.send_if_modified(|s| {
            if !s.catalog.contains(id) {
                return false;
            }
            outcome = Ok(s.selection.toggle(id));
            true
        });
        if let Err(err) = &outcome {
            self.inner.report(err);
        }
        outcome
    }

    /// Appends an uploaded clip and returns the number of uploads.
    pub fn upload_clip(&self, resource: Box<dyn LocalResource>) -> usize {
        let clip = UploadedClip::new(resource);
        logi(format!("Uploaded clip {}", clip.local_url()));
        let mut count = 0;
        self.inner.state.send_modify(|s| {
            s.catalog.push_upload(clip);
            count = s.catalog.uploads().len();
        });
        count
    }

    pub fn build_merge_list(&self) -> StudioResult<Vec<String>> {
        let list = self.with_state(StudioState::merge_list);
        match list {
            Ok(list) => {
                debug!("Videos to merge: {:?}", list);
                Ok(list)
            }
            Err(err) => {
                self.inner.report(&err);
                Err(err)
            }
        }
    }

    pub async fn init_speech(&self) -> StudioResult<()> {
        let result = self.inner.speech.init().await;
        if let Err(err) = &result {
            error!("Speech initialization error: {}", err);
            self.inner
                .notifier
                .notify(Notice::error("Speech synthesis initialization failed"));
        }
        result
    }

    pub async fn speak(&self, text: &str) -> StudioResult<usize> {
        let result = self.inner.speech.speak(text).await;
        match &result {
            Ok(n) => logok(format!("Text has been spoken ({} utterances)", n)),
            Err(StudioError::NotReady(_)) => self
                .inner
                .notifier
                .notify(Notice::error("Speech synthesis not initialized")),
            Err(StudioError::Collaborator { message, .. }) => {
                error!("Speech synthesis error: {}", message);
                self.inner.notifier.notify(Notice::error("Text-to-speech error"));
            }
            Err(err) => self.inner.report(err),
        }
        result
    }

    pub async fn copy_script(&self) -> StudioResult<()> {
        let text = self.with_state(|s| s.script.result().map(str::to_string));
        let Some(text) = text else {
            let err = StudioError::validation("No generated script to copy");
            self.inner.report(&err);
            return Err(err);
        };

        match self.inner.clipboard.copy_text(&text).await {
            Ok(()) => {
                self.inner
                    .notifier
                    .notify(Notice::success("Script copied to clipboard!"));
                Ok(())
            }
            Err(err) => {
                self.inner
                    .notifier
                    .notify(Notice::error(format!("Failed to copy text: {}", err)));
                Err(err)
            }
        }
    }

    /// Saves one candidate as `dir/video_<n>.mp4`, `n` counting from one.
    pub async fn download_candidate(&self, id: CandidateId, dir: &Path) -> StudioResult<PathBuf> {
        let url = self.with_state(|s| s.catalog.candidate(id).map(|c| c.download_url.clone()));
        let Some(url) = url else {
            let err = StudioError::validation(format!(
                "Video {} is not part of the current results",
                id
            ));
            self.inner.report(&err);
            return Err(err);
        };

        let dest = dir.join(format!("video_{}.mp4", id.index + 1));
        match self.inner.downloader.download(&url, &dest).await {
            Ok(bytes) => {
                logok(format!("Downloaded {} ({} bytes) -> {}", url, bytes, dest.display()));
                Ok(dest)
            }
            Err(err) => {
                self.inner.report(&err);
                Err(err)
            }
        }
    }

    /// Writes the current merge list as a concat playlist at `path`.
    pub async fn export_playlist(&self, path: &Path) -> StudioResult<usize> {
        let list = self.build_merge_list()?;
        if list.is_empty() {
            let err = StudioError::validation("Select or upload at least one video to merge");
            self.inner.report(&err);
            return Err(err);
        }

        if let Err(err) = playlist::write_concat_list(&list, path).await {
            let err = StudioError::collaborator("playlist export", format!("{:#}", err));
            self.inner.report(&err);
            return Err(err);
        }
        logok(format!("Wrote playlist ({} clips): {}", list.len(), path.display()));
        Ok(list.len())
    }
}

impl Inner {
    fn report(&self, err: &StudioError) {
        if let StudioError::InvariantViolation(msg) = err {
            error!("invariant violation: {}", msg);
        }
        self.notifier.notify(Notice::error(err.to_string()));
    }

    /// Runs one collaborator call in its own task, bounded by the request
    /// timeout. A panic or an expired call comes back as a collaborator error
    /// so the request still reaches a terminal state.
    async fn call<T, F>(&self, service: &'static str, fut: F) -> StudioResult<T>
    where
        T: Send + 'static,
        F: std::future::Future<Output = StudioResult<T>> + Send + 'static,
    {
        let mut task = tokio::spawn(fut);
        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) if join.is_panic() => {
                error!("{} task panicked", service);
                Err(StudioError::collaborator(service, "backend panicked"))
            }
            Ok(Err(_)) => Err(StudioError::collaborator(service, "backend task cancelled")),
            Err(_) => {
                task.abort();
                Err(StudioError::collaborator(
                    service,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        }
    }

    async fn finish_script(&self, prompt: String, token: u64) {
        let scripts = Arc::clone(&self.scripts);
        let call = async move { scripts.generate(&prompt).await };
        let outcome = match self.call("script generation", call).await {
            Ok(resp) => resp.first_text(),
            Err(err) => Err(err),
        };

        let applied = self.state.send_if_modified(|s| {
            if s.script.token() != token {
                return false;
            }
            match &outcome {
                Ok(text) => s.script.succeed(text.clone()),
                Err(err) => s.script.fail(err.to_string()),
            }
        });
        if !applied {
            debug!("dropping superseded script result #{}", token);
            return;
        }

        match outcome {
            Ok(text) => logok(format!("Script #{} ready ({} chars)", token, text.chars().count())),
            Err(err) => self.report(&err),
        }
    }

    async fn finish_search(&self, query: String, token: u64) {
        let searcher = Arc::clone(&self.searcher);
        let q = query.clone();
        let outcome = self
            .call("video search", async move { searcher.search(&q).await })
            .await;

        let applied = self.state.send_if_modified(|s| {
            if s.search.token() != token {
                return false;
            }
            match &outcome {
                Ok(clips) => {
                    s.catalog.replace_candidates(clips.clone());
                    s.selection.clear();
                    s.search.succeed(clips.len())
                }
                Err(err) => s.search.fail(err.to_string()),
            }
        });
        if !applied {
            debug!("dropping superseded search result #{}", token);
            return;
        }

        match outcome {
            Ok(clips) => logok(format!("Found {} videos for \"{}\"", clips.len(), query)),
            Err(err) => self.report(&err),
        }
    }
}
