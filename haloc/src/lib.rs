//! Loop closure detection via image hashes (HALOC).
//!
//! # Architecture
//!
//! Each incoming image goes through three stages:
//!
//! 1. [`DescriptorExtractor::extract`]: image -> descriptor matrix (one row per keypoint)
//! 2. [`Hasher::calc_hash`]: descriptors -> fixed-length hash of `num_proj * D` floats
//! 3. [`Matcher`]: stores the hash and ranks every other stored hash by
//!    Euclidean distance ([`similarity`]), closest first
//!
//! [`Haloc`] ties the stages together behind a single `process` call.
//!
//! # Projection Basis
//!
//! Hashes are weighted sums of descriptor rows, one per vector of a random
//! [`ProjectionBasis`]. The basis vectors are mutually orthogonal, built
//! incrementally by solving one small linear system per vector. The basis
//! is created once, on the first hash, from the engine's seeded generator:
//!
//! ```text
//! seed -> basis (num_proj x max_desc) -> hash(image) = [p_i . desc[:, n]]
//! ```
//!
//! Images with more than `max_desc` descriptors are randomly subsampled
//! from the same generator, so a fixed seed makes the whole engine
//! reproducible.
//!
//! # Usage
//!
//! ```
//! use std::collections::HashSet;
//! use giztoy_haloc::{DescriptorMatrix, HalocConfig, HalocError, Matcher};
//!
//! let mut matcher = Matcher::new(&HalocConfig::new(2, 20).with_seed(7)).unwrap();
//! let a = DescriptorMatrix::from_rows(vec![vec![0.1, -0.2], vec![0.4, 0.3]]).unwrap();
//! let b = DescriptorMatrix::from_rows(vec![vec![0.9, 0.8], vec![-0.7, 0.1]]).unwrap();
//!
//! // The first image has nothing to match against.
//! let first = matcher.process_descriptors(1, &a, 1, &HashSet::new());
//! assert!(matches!(first, Err(HalocError::NoCandidates)));
//!
//! matcher.process_descriptors(2, &b, 1, &HashSet::new()).unwrap();
//! let ids = matcher.process_descriptors(3, &a, 1, &HashSet::new()).unwrap();
//! assert_eq!(ids, vec![1]);
//! ```

mod basis;
mod config;
mod descriptor;
mod error;
mod extractor;
mod haloc;
mod hasher;
mod matcher;
mod store;

pub use basis::{BASIS_TOLERANCE, ProjectionBasis};
pub use config::{EXTRACTOR_OVERSHOOT_MARGIN, HalocConfig};
pub use descriptor::DescriptorMatrix;
pub use error::{ErrorKind, HalocError};
pub use extractor::{DescriptorExtractor, Frame};
pub use haloc::Haloc;
pub use hasher::{Hasher, INVALID_SIMILARITY, similarity, try_similarity};
pub use matcher::Matcher;
pub use store::{Candidate, FingerprintStore};

/// Caller-assigned unique image identifier.
pub type ImageId = u32;
