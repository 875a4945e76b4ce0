use std::collections::BTreeSet;

use tracing::error;

use crate::error::{StudioError, StudioResult};
use crate::media::{CandidateId, MediaCatalog};

/// Candidates chosen for the final assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    chosen: BTreeSet<CandidateId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `id` and returns whether it is now chosen.
    pub fn toggle(&mut self, id: CandidateId) -> bool {
        if self.chosen.remove(&id) {
            false
        } else {
            self.chosen.insert(id);
            true
        }
    }

    pub fn is_chosen(&self, id: CandidateId) -> bool {
        self.chosen.contains(&id)
    }

    pub fn clear(&mut self) {
        self.chosen.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chosen.len()
    }

    /// Download URLs of the chosen candidates, ascending by index.
    pub fn materialize(&self, catalog: &MediaCatalog) -> StudioResult<Vec<String>> {
        let mut chosen: Vec<CandidateId> = self.chosen.iter().copied().collect();
        chosen.sort_by_key(|id| id.index);

        let mut urls = Vec::with_capacity(chosen.len());
        for id in chosen {
            match catalog.candidate(id) {
                Some(candidate) => urls.push(candidate.download_url.clone()),
                None => {
                    error!(
                        "selection holds candidate {} but catalog is at generation {}",
                        id,
                        catalog.generation()
                    );
                    return Err(StudioError::InvariantViolation(format!(
                        "selected candidate {id} is not in the current catalog"
                    )));
                }
            }
        }
        Ok(urls)
    }
}
