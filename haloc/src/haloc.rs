use std::collections::HashSet;

use crate::error::ErrorKind;
use crate::extractor::{DescriptorExtractor, Frame};
use crate::matcher::Matcher;
use crate::store::FingerprintStore;
use crate::{HalocConfig, HalocError, ImageId, ProjectionBasis};

/// Loop closure candidate retrieval for a stream of images.
///
/// Each [`Haloc::process`] call extracts descriptors from the image, hashes
/// them, stores the hash under the image id and returns the closest
/// previously stored images.
pub struct Haloc {
    matcher: Matcher,
    extractor: Box<dyn DescriptorExtractor>,
    target: usize,
}

impl Haloc {
    /// Creates an engine. The projection basis is built on the first image.
    pub fn new(
        cfg: HalocConfig,
        extractor: Box<dyn DescriptorExtractor>,
    ) -> Result<Self, HalocError> {
        let matcher = Matcher::new(&cfg)?;
        Ok(Self {
            matcher,
            extractor,
            target: cfg.extractor_target(),
        })
    }

    /// Creates an engine around a pre-built basis.
    pub fn with_basis(
        basis: ProjectionBasis,
        seed: Option<u64>,
        extractor: Box<dyn DescriptorExtractor>,
    ) -> Self {
        let target = HalocConfig::new(basis.num_proj(), basis.max_desc()).extractor_target();
        Self {
            matcher: Matcher::with_basis(basis, seed),
            extractor,
            target,
        }
    }

    /// Returns up to `num_candidates` ids of stored images most similar to
    /// `frame`, best first, skipping `images_to_ignore`.
    ///
    /// Errors keep the failure kind apart: an empty or malformed frame is
    /// [`ErrorKind::Input`] and leaves the store untouched; a hash that comes
    /// out empty is [`ErrorKind::Internal`]; [`HalocError::NoCandidates`]
    /// means the hash was stored but nothing else was eligible.
    pub fn process(
        &mut self,
        image_id: ImageId,
        frame: &Frame,
        num_candidates: usize,
        images_to_ignore: &HashSet<ImageId>,
    ) -> Result<Vec<ImageId>, HalocError> {
        frame.validate()?;
        let desc = self.extractor.extract(frame, self.target)?;
        tracing::debug!(
            image_id,
            rows = desc.rows(),
            cols = desc.cols(),
            "haloc: extracted descriptors"
        );
        self.matcher
            .process_descriptors(image_id, &desc, num_candidates, images_to_ignore)
    }

    /// Like [`Haloc::process`], but logs the failure and returns `None`.
    pub fn candidates(
        &mut self,
        image_id: ImageId,
        frame: &Frame,
        num_candidates: usize,
        images_to_ignore: &HashSet<ImageId>,
    ) -> Option<Vec<ImageId>> {
        match self.process(image_id, frame, num_candidates, images_to_ignore) {
            Ok(ids) => Some(ids),
            Err(e) => {
                match e.kind() {
                    ErrorKind::NoResult => tracing::warn!(image_id, "{e}"),
                    ErrorKind::Input | ErrorKind::Internal => tracing::error!(image_id, "{e}"),
                }
                None
            }
        }
    }

    /// Descriptor count requested from the extractor per image.
    pub fn extractor_target(&self) -> usize {
        self.target
    }

    /// Returns the hashes stored so far.
    pub fn store(&self) -> &FingerprintStore {
        self.matcher.store()
    }

    /// Returns the matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Returns the matcher mutably, for queries on precomputed descriptors.
    pub fn matcher_mut(&mut self) -> &mut Matcher {
        &mut self.matcher
    }
}
