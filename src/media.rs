use std::fmt;

use crate::upload::LocalResource;

/// Identity of one search result.
///
/// `index` is the position inside the search that produced the candidate and
/// orders the merge list. `generation` names that search, so an id kept
/// from an earlier search never resolves against a newer catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateId {
    pub generation: u64,
    pub index: usize,
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.generation, self.index)
    }
}

/// A clip as returned by a video search, before it is given an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundClip {
    pub preview_url: String,
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCandidate {
    pub id: CandidateId,
    pub preview_url: String,
    pub download_url: String,
}

/// A user supplied clip. The backing handle is released when the clip drops.
pub struct UploadedClip {
    resource: Box<dyn LocalResource>,
}

impl UploadedClip {
    pub fn new(resource: Box<dyn LocalResource>) -> Self {
        Self { resource }
    }

    pub fn local_url(&self) -> &str {
        self.resource.local_url()
    }
}

impl fmt::Debug for UploadedClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedClip")
            .field("local_url", &self.local_url())
            .finish()
    }
}

impl Drop for UploadedClip {
    fn drop(&mut self) {
        self.resource.release();
    }
}

#[derive(Debug, Default)]
pub struct MediaCatalog {
    generation: u64,
    candidates: Vec<VideoCandidate>,
    uploads: Vec<UploadedClip>,
}

impl MediaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn candidates(&self) -> &[VideoCandidate] {
        &self.candidates
    }

    pub fn uploads(&self) -> &[UploadedClip] {
        &self.uploads
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&VideoCandidate> {
        if id.generation != self.generation {
            return None;
        }
        self.candidates.get(id.index)
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.candidate(id).is_some()
    }

    /// Swaps in a new result set under a fresh generation. Callers holding a
    /// selection must clear it in the same transition.
    pub fn replace_candidates(&mut self, clips: Vec<FoundClip>) {
        self.generation += 1;
        let generation = self.generation;
        self.candidates = clips
            .into_iter()
            .enumerate()
            .map(|(index, clip)| VideoCandidate {
                id: CandidateId { generation, index },
                preview_url: clip.preview_url,
                download_url: clip.download_url,
            })
            .collect();
    }

    pub fn push_upload(&mut self, clip: UploadedClip) {
        self.uploads.push(clip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(name: &str) -> FoundClip {
        FoundClip {
            preview_url: format!("https://cdn.test/{name}.mp4"),
            download_url: format!("https://cdn.test/{name}.mp4"),
        }
    }

    #[test]
    fn replace_assigns_ordinal_ids_under_new_generation() {
        let mut catalog = MediaCatalog::new();
        catalog.replace_candidates(vec![clip("a"), clip("b")]);
        let first = catalog.candidates()[1].id;
        assert_eq!(first.index, 1);
        assert!(catalog.contains(first));

        catalog.replace_candidates(vec![clip("c"), clip("d")]);
        assert!(!catalog.contains(first));
        assert_eq!(catalog.candidates()[1].id.generation, first.generation + 1);
    }

    #[test]
    fn out_of_range_index_is_not_found() {
        let mut catalog = MediaCatalog::new();
        catalog.replace_candidates(vec![clip("a")]);
        let id = CandidateId {
            generation: catalog.generation(),
            index: 4,
        };
        assert!(catalog.candidate(id).is_none());
    }
}
