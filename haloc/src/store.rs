use std::collections::{BTreeMap, HashSet};

use crate::ImageId;
use crate::hasher::try_similarity;

/// A single retrieval result.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Identifier of the matched image.
    pub id: ImageId,

    /// Distance between the query hash and the candidate's hash.
    /// Lower values indicate higher similarity.
    pub similarity: f32,
}

/// In-memory map from image id to hash.
///
/// Entries are only ever added or overwritten; nothing is evicted.
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct FingerprintStore {
    hashes: BTreeMap<ImageId, Vec<f32>>,
}

impl FingerprintStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `hash` under `id`, replacing any previous hash for that id.
    /// Returns the replaced hash.
    pub fn upsert(&mut self, id: ImageId, hash: Vec<f32>) -> Option<Vec<f32>> {
        self.hashes.insert(id, hash)
    }

    /// Returns the hash stored under `id`, if any.
    pub fn get(&self, id: ImageId) -> Option<&[f32]> {
        self.hashes.get(&id).map(Vec::as_slice)
    }

    /// Returns true if a hash is stored under `id`.
    pub fn contains(&self, id: ImageId) -> bool {
        self.hashes.contains_key(&id)
    }

    /// Stored ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.hashes.keys().copied()
    }

    /// Returns the number of stored hashes.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns true if nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Ranks stored hashes by distance to `hash`, closest first.
    ///
    /// `exclude` (the querying image itself) and every id in `ignore` are
    /// skipped, as are hashes whose length differs from the query. Equal
    /// distances are ordered by ascending id. At most `top_k` candidates
    /// are returned.
    pub fn rank(
        &self,
        hash: &[f32],
        exclude: Option<ImageId>,
        ignore: &HashSet<ImageId>,
        top_k: usize,
    ) -> Vec<Candidate> {
        if top_k == 0 {
            return Vec::new();
        }

        let mut results: Vec<Candidate> = self
            .hashes
            .iter()
            .filter(|&(&id, _)| Some(id) != exclude && !ignore.contains(&id))
            .filter_map(|(&id, stored)| match try_similarity(hash, stored) {
                Ok(similarity) if similarity.is_finite() && similarity >= 0.0 => {
                    Some(Candidate { id, similarity })
                }
                Ok(similarity) => {
                    tracing::warn!(id, similarity, "haloc: discarding invalid similarity");
                    None
                }
                Err(e) => {
                    tracing::warn!(id, "haloc: skipping stored hash: {e}");
                    None
                }
            })
            .collect();

        // BTreeMap iteration is by ascending id and the sort is stable.
        results.sort_by(|a, b| a.similarity.total_cmp(&b.similarity));
        results.truncate(top_k);
        results
    }
}
