use std::fmt;

use thiserror::Error;

use crate::ImageId;

/// Errors returned by haloc operations.
#[derive(Debug, Error)]
pub enum HalocError {
    #[error("haloc: invalid config: {0}")]
    InvalidConfig(String),

    #[error("haloc: image is empty")]
    EmptyImage,

    #[error("haloc: invalid image: expected {expected} bytes, got {got}")]
    InvalidImage { expected: usize, got: usize },

    #[error("haloc: descriptor matrix is empty")]
    EmptyDescriptors,

    #[error("haloc: invalid descriptors: {0}")]
    InvalidDescriptors(String),

    #[error("haloc: hash length mismatch: {left} vs {right}")]
    HashLengthMismatch { left: usize, right: usize },

    #[error("haloc: invalid basis: {0}")]
    InvalidBasis(String),

    #[error("haloc: basis construction failed at vector {index}: {reason}")]
    Basis { index: usize, reason: String },

    #[error("haloc: extractor: {0}")]
    Extractor(String),

    #[error("haloc: hash for image {0} is empty")]
    EmptyHash(ImageId),

    #[error("haloc: no candidates found")]
    NoCandidates,
}

/// Coarse classification of a [`HalocError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied something unusable (image, descriptors, config).
    Input,
    /// The engine failed on valid input.
    Internal,
    /// Nothing eligible to return. Expected, not a failure.
    NoResult,
}

impl HalocError {
    /// Returns the category a caller can branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_)
            | Self::EmptyImage
            | Self::InvalidImage { .. }
            | Self::EmptyDescriptors
            | Self::InvalidDescriptors(_)
            | Self::HashLengthMismatch { .. }
            | Self::InvalidBasis(_) => ErrorKind::Input,
            Self::Basis { .. } | Self::Extractor(_) | Self::EmptyHash(_) => ErrorKind::Internal,
            Self::NoCandidates => ErrorKind::NoResult,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Internal => write!(f, "internal"),
            Self::NoResult => write!(f, "no_result"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        assert_eq!(HalocError::EmptyImage.kind(), ErrorKind::Input);
        assert_eq!(
            HalocError::HashLengthMismatch { left: 3, right: 4 }.kind(),
            ErrorKind::Input
        );
        assert_eq!(HalocError::EmptyHash(7).kind(), ErrorKind::Internal);
        assert_eq!(HalocError::NoCandidates.kind(), ErrorKind::NoResult);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            HalocError::HashLengthMismatch { left: 3, right: 4 }.to_string(),
            "haloc: hash length mismatch: 3 vs 4"
        );
        assert_eq!(ErrorKind::NoResult.to_string(), "no_result");
    }
}
