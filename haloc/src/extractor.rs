use crate::{DescriptorMatrix, HalocError};

/// A raw raster image, row-major, `channels` bytes per pixel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl Frame {
    /// Creates a frame. The shape is not checked until [`Frame::validate`].
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Creates a single-channel frame.
    pub fn gray(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self::new(width, height, 1, data)
    }

    /// True when the frame has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.channels == 0 || self.data.is_empty()
    }

    /// Checks that the frame is non-empty and its buffer matches its shape.
    pub fn validate(&self) -> Result<(), HalocError> {
        if self.is_empty() {
            return Err(HalocError::EmptyImage);
        }
        // An unrepresentable shape can never match a buffer.
        let expected = self
            .width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(self.channels))
            .unwrap_or(usize::MAX);
        if self.data.len() != expected {
            return Err(HalocError::InvalidImage {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Detects keypoints in an image and describes them.
///
/// The output has one row per keypoint. Implementations should aim for
/// `target` rows; returning a few more is tolerated (extra rows are
/// subsampled away during hashing). Values should be normalized roughly
/// into `[-1, 1]`.
///
/// Returning an empty matrix means nothing was detected.
pub trait DescriptorExtractor: Send + Sync {
    /// Returns the descriptors of `frame`, aiming for `target` rows.
    fn extract(&self, frame: &Frame, target: usize) -> Result<DescriptorMatrix, HalocError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame() {
        assert!(Frame::default().is_empty());
        assert!(matches!(Frame::gray(0, 4, vec![]).validate(), Err(HalocError::EmptyImage)));
    }

    #[test]
    fn frame_size_mismatch() {
        let err = Frame::gray(4, 4, vec![0; 10]).validate().unwrap_err();
        assert!(matches!(err, HalocError::InvalidImage { expected: 16, got: 10 }));
    }

    #[test]
    fn oversized_frame_rejected() {
        let err = Frame::new(usize::MAX, 2, 1, vec![1]).validate().unwrap_err();
        assert!(matches!(
            err,
            HalocError::InvalidImage { expected: usize::MAX, got: 1 }
        ));
        assert_eq!(err.kind(), crate::ErrorKind::Input);
    }

    #[test]
    fn valid_frame() {
        assert!(Frame::new(2, 3, 3, vec![0; 18]).validate().is_ok());
    }
}
