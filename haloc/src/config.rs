use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::HalocError;

/// Number of descriptors subtracted from `max_desc` when asking the extractor
/// for features. Detectors tend to return a few more keypoints than requested.
pub const EXTRACTOR_OVERSHOOT_MARGIN: usize = 5;

/// Controls hashing and matching. Fixed for an engine's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalocConfig {
    /// Number of projection vectors. The hash length is
    /// `num_proj * descriptor_dim`.
    /// Default: 3.
    pub num_proj: usize,

    /// Length of each projection vector, and the maximum number of
    /// descriptor rows used per image.
    /// Default: 100.
    pub max_desc: usize,

    /// Seed for basis construction and row subsampling.
    /// `None` derives one from the system clock.
    pub seed: Option<u64>,
}

impl Default for HalocConfig {
    fn default() -> Self {
        Self {
            num_proj: 3,
            max_desc: 100,
            seed: None,
        }
    }
}

impl HalocConfig {
    /// Creates a config with a time-derived seed.
    pub fn new(num_proj: usize, max_desc: usize) -> Self {
        Self {
            num_proj,
            max_desc,
            seed: None,
        }
    }

    /// Fixes the seed, making basis and subsampling reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Rejects shapes for which the incremental basis solve is ill-posed.
    pub fn validate(&self) -> Result<(), HalocError> {
        if self.num_proj == 0 {
            return Err(HalocError::InvalidConfig("num_proj must be positive".into()));
        }
        if self.max_desc == 0 {
            return Err(HalocError::InvalidConfig("max_desc must be positive".into()));
        }
        if self.num_proj > self.max_desc {
            return Err(HalocError::InvalidConfig(format!(
                "num_proj ({}) must not exceed max_desc ({})",
                self.num_proj, self.max_desc
            )));
        }
        Ok(())
    }

    /// Descriptor count requested from the extractor.
    pub fn extractor_target(&self) -> usize {
        self.max_desc.saturating_sub(EXTRACTOR_OVERSHOOT_MARGIN).max(1)
    }

    /// The configured seed, or one derived from the current time.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(HalocConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_more_projections_than_rows() {
        let err = HalocConfig::new(11, 10).validate().unwrap_err();
        assert!(matches!(err, HalocError::InvalidConfig(_)));
        assert!(HalocConfig::new(10, 10).validate().is_ok());
    }

    #[test]
    fn rejects_zero_sizes() {
        assert!(HalocConfig::new(0, 10).validate().is_err());
        assert!(HalocConfig::new(1, 0).validate().is_err());
    }

    #[test]
    fn extractor_target_margin() {
        assert_eq!(HalocConfig::new(2, 100).extractor_target(), 95);
        assert_eq!(HalocConfig::new(2, 4).extractor_target(), 1);
    }

    #[test]
    fn explicit_seed_is_used() {
        let cfg = HalocConfig::new(2, 10).with_seed(42);
        assert_eq!(cfg.resolve_seed(), 42);
    }

    #[test]
    fn deserialize_with_defaults() {
        let cfg: HalocConfig = serde_json::from_str(r#"{"num_proj": 5}"#).unwrap();
        assert_eq!(cfg.num_proj, 5);
        assert_eq!(cfg.max_desc, 100);
        assert_eq!(cfg.seed, None);
    }
}
