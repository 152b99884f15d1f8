//! Config and recording file loading.

use std::path::Path;

use anyhow::{Context, Result};
use giztoy_haloc::{DescriptorMatrix, HalocConfig, ImageId};
use serde::Deserialize;

/// A recorded descriptor stream, one entry per frame in arrival order.
#[derive(Debug, Deserialize)]
pub struct Recording {
    pub frames: Vec<RecordedFrame>,
}

/// One recorded frame.
#[derive(Debug, Deserialize)]
pub struct RecordedFrame {
    pub id: ImageId,
    pub descriptors: DescriptorMatrix,
    /// Extra ids to ignore for this frame only.
    #[serde(default)]
    pub ignore: Vec<ImageId>,
}

/// Parses YAML for `.yaml`/`.yml` paths and JSON otherwise.
fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_slice(&data).with_context(|| format!("parse YAML {}", path.display()))
    } else {
        serde_json::from_slice(&data).with_context(|| format!("parse JSON {}", path.display()))
    }
}

pub fn load_recording(path: &Path) -> Result<Recording> {
    load(path)
}

/// Loads the engine config, or the default when no file is given, then
/// applies command-line overrides.
pub fn load_config(
    path: Option<&Path>,
    num_proj: Option<usize>,
    max_desc: Option<usize>,
    seed: Option<u64>,
) -> Result<HalocConfig> {
    let mut cfg = match path {
        Some(p) => load(p)?,
        None => HalocConfig::default(),
    };
    if let Some(n) = num_proj {
        cfg.num_proj = n;
    }
    if let Some(n) = max_desc {
        cfg.max_desc = n;
    }
    if seed.is_some() {
        cfg.seed = seed;
    }
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_from_yaml() {
        let rec: Recording = serde_yaml::from_str(
            r#"
frames:
  - id: 1
    descriptors: [[0.1, 0.2], [0.3, 0.4]]
  - id: 2
    descriptors: [[0.5, 0.6]]
    ignore: [1]
"#,
        )
        .unwrap();
        assert_eq!(rec.frames.len(), 2);
        assert_eq!(rec.frames[0].descriptors.rows(), 2);
        assert!(rec.frames[0].ignore.is_empty());
        assert_eq!(rec.frames[1].ignore, vec![1]);
    }

    #[test]
    fn ragged_recording_rejected() {
        let res: Result<Recording, _> =
            serde_json::from_str(r#"{"frames": [{"id": 1, "descriptors": [[0.1], [0.2, 0.3]]}]}"#);
        assert!(res.is_err());
    }

    #[test]
    fn overrides_applied() {
        let cfg = load_config(None, Some(4), Some(64), Some(9)).unwrap();
        assert_eq!(cfg, HalocConfig::new(4, 64).with_seed(9));
    }

    #[test]
    fn invalid_override_rejected() {
        assert!(load_config(None, Some(200), None, None).is_err());
    }
}
