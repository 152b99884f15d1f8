use std::collections::HashSet;

use crate::store::{Candidate, FingerprintStore};
use crate::{DescriptorMatrix, HalocConfig, HalocError, Hasher, ImageId, ProjectionBasis};

/// Hashes incoming descriptor sets, stores them and retrieves the most
/// similar previously seen images.
///
/// Not thread-safe by itself: every call that hashes mutates the generator
/// and the store. Hosts sharing a Matcher across threads must hold a lock
/// for the whole call.
pub struct Matcher {
    hasher: Hasher,
    store: FingerprintStore,
}

impl Matcher {
    /// Creates a Matcher whose basis is built on the first query.
    pub fn new(cfg: &HalocConfig) -> Result<Self, HalocError> {
        Ok(Self::with_hasher(Hasher::new(cfg)?))
    }

    /// Creates a Matcher using a pre-built basis.
    pub fn with_basis(basis: ProjectionBasis, seed: Option<u64>) -> Self {
        Self::with_hasher(Hasher::with_basis(basis, seed))
    }

    /// Creates a Matcher around an existing hasher and an empty store.
    pub fn with_hasher(hasher: Hasher) -> Self {
        Self {
            hasher,
            store: FingerprintStore::new(),
        }
    }

    /// Hashes `desc`, stores it under `image_id` and returns the ids of the
    /// `num_candidates` closest other images, best first.
    ///
    /// The hash is stored before ranking, so it stays stored even when no
    /// candidates are found.
    pub fn process_descriptors(
        &mut self,
        image_id: ImageId,
        desc: &DescriptorMatrix,
        num_candidates: usize,
        images_to_ignore: &HashSet<ImageId>,
    ) -> Result<Vec<ImageId>, HalocError> {
        let found = self.query(image_id, desc, num_candidates, images_to_ignore)?;
        Ok(found.into_iter().map(|c| c.id).collect())
    }

    /// Same as [`Matcher::process_descriptors`] but keeps the distances.
    pub fn query(
        &mut self,
        image_id: ImageId,
        desc: &DescriptorMatrix,
        num_candidates: usize,
        images_to_ignore: &HashSet<ImageId>,
    ) -> Result<Vec<Candidate>, HalocError> {
        let hash = match self.hasher.calc_hash(desc) {
            Ok(h) if !h.is_empty() => h,
            Ok(_) | Err(HalocError::EmptyDescriptors) => {
                return Err(HalocError::EmptyHash(image_id));
            }
            Err(e) => return Err(e),
        };

        if self.store.upsert(image_id, hash).is_some() {
            tracing::debug!(image_id, "haloc: replaced stored hash");
        }

        let hash = self.store.get(image_id).unwrap_or_default();
        let found = self
            .store
            .rank(hash, Some(image_id), images_to_ignore, num_candidates);
        if found.is_empty() {
            return Err(HalocError::NoCandidates);
        }
        Ok(found)
    }

    /// Returns the hashes stored so far.
    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    /// Returns the hasher.
    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Returns the hasher mutably, e.g. to build its basis eagerly.
    pub fn hasher_mut(&mut self) -> &mut Hasher {
        &mut self.hasher
    }
}
