use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Issues monotonically increasing request tokens for one slot.
///
/// A completion is applied only while its token is still the one recorded
/// in the slot; anything older was superseded and is dropped.
#[derive(Debug, Default)]
pub struct Fence {
    issued: AtomicU64,
}

impl Fence {
    pub fn next(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptRequest {
    prompt: String,
    status: RequestStatus,
    result: Option<String>,
    error: Option<String>,
    token: u64,
}

impl ScriptRequest {
    pub fn pending(prompt: impl Into<String>, token: u64) -> Self {
        Self {
            prompt: prompt.into(),
            status: RequestStatus::Pending,
            result: None,
            error: None,
            token,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// Generated script text, present only once the request succeeded.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub(crate) fn succeed(&mut self, text: String) -> bool {
        if self.status != RequestStatus::Pending {
            return false;
        }
        self.status = RequestStatus::Succeeded;
        self.result = Some(text);
        true
    }

    pub(crate) fn fail(&mut self, message: String) -> bool {
        if self.status != RequestStatus::Pending {
            return false;
        }
        self.status = RequestStatus::Failed;
        self.error = Some(message);
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoSearchRequest {
    query: String,
    status: RequestStatus,
    found: usize,
    error: Option<String>,
    token: u64,
}

impl VideoSearchRequest {
    pub fn pending(query: impl Into<String>, token: u64) -> Self {
        Self {
            query: query.into(),
            status: RequestStatus::Pending,
            found: 0,
            error: None,
            token,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// Number of candidates the completed search put in the catalog.
    pub fn found(&self) -> usize {
        self.found
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub(crate) fn succeed(&mut self, found: usize) -> bool {
        if self.status != RequestStatus::Pending {
            return false;
        }
        self.status = RequestStatus::Succeeded;
        self.found = found;
        true
    }

    pub(crate) fn fail(&mut self, message: String) -> bool {
        if self.status != RequestStatus::Pending {
            return false;
        }
        self.status = RequestStatus::Failed;
        self.error = Some(message);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_tokens_increase() {
        let fence = Fence::default();
        let a = fence.next();
        let b = fence.next();
        assert!(b > a);
    }

    #[test]
    fn script_request_settles_once() {
        let mut req = ScriptRequest::pending("volcanoes", 1);
        assert_eq!(req.status(), RequestStatus::Pending);
        assert!(req.result().is_none());

        assert!(req.succeed("Lava flows.".to_string()));
        assert!(!req.fail("late failure".to_string()));
        assert_eq!(req.status(), RequestStatus::Succeeded);
        assert_eq!(req.result(), Some("Lava flows."));
        assert!(req.error().is_none());
    }

    #[test]
    fn idle_request_cannot_settle() {
        let mut req = ScriptRequest::default();
        assert!(!req.succeed("text".to_string()));
        assert_eq!(req.status(), RequestStatus::Idle);
    }

    #[test]
    fn failed_search_keeps_no_count() {
        let mut req = VideoSearchRequest::pending("sunset", 3);
        assert!(req.fail("HTTP 502".to_string()));
        assert_eq!(req.status(), RequestStatus::Failed);
        assert_eq!(req.found(), 0);
        assert_eq!(req.error(), Some("HTTP 502"));
        assert!(req.status().is_terminal());
    }
}
