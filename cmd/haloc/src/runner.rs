//! Replays a recording through a [`Matcher`].

use std::collections::{HashSet, VecDeque};

use giztoy_haloc::{ErrorKind, ImageId, Matcher};
use serde::Serialize;

use crate::config::Recording;

/// Full replay output.
#[derive(Debug, Serialize)]
pub struct Report {
    pub num_proj: usize,
    pub max_desc: usize,
    pub seed: u64,
    pub frames: Vec<FrameReport>,
}

/// Result for one frame.
#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub id: ImageId,
    /// "ok", "no_result", "input" or "internal".
    pub status: String,
    pub candidates: Vec<CandidateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CandidateReport {
    pub id: ImageId,
    pub similarity: f32,
}

/// Options for [`replay`].
pub struct ReplayOptions {
    pub num_candidates: usize,
    /// Ids of the last N frames are ignored, so the frames right before the
    /// current one are not reported as loop closures.
    pub ignore_recent: usize,
}

pub fn replay(matcher: &mut Matcher, recording: &Recording, opts: &ReplayOptions) -> Report {
    let mut recent: VecDeque<ImageId> = VecDeque::with_capacity(opts.ignore_recent + 1);
    let mut frames = Vec::with_capacity(recording.frames.len());

    for frame in &recording.frames {
        let ignore: HashSet<ImageId> = recent
            .iter()
            .chain(frame.ignore.iter())
            .copied()
            .collect();

        let report = match matcher.query(frame.id, &frame.descriptors, opts.num_candidates, &ignore) {
            Ok(found) => FrameReport {
                id: frame.id,
                status: "ok".into(),
                candidates: found
                    .into_iter()
                    .map(|c| CandidateReport {
                        id: c.id,
                        similarity: c.similarity,
                    })
                    .collect(),
                error: None,
            },
            Err(e) => {
                match e.kind() {
                    ErrorKind::NoResult => tracing::debug!(id = frame.id, "{e}"),
                    ErrorKind::Input | ErrorKind::Internal => tracing::warn!(id = frame.id, "{e}"),
                }
                FrameReport {
                    id: frame.id,
                    status: e.kind().to_string(),
                    candidates: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        frames.push(report);

        if opts.ignore_recent > 0 {
            if recent.len() == opts.ignore_recent {
                recent.pop_front();
            }
            recent.push_back(frame.id);
        }
    }

    let hasher = matcher.hasher();
    Report {
        num_proj: hasher.num_proj(),
        max_desc: hasher.max_desc(),
        seed: hasher.seed(),
        frames,
    }
}

#[cfg(test)]
mod tests {
    use giztoy_haloc::{DescriptorMatrix, HalocConfig};

    use super::*;
    use crate::config::RecordedFrame;

    fn frame(id: ImageId, phase: f32) -> RecordedFrame {
        let rows = (0..6)
            .map(|r| (0..4).map(|c| ((r * 4 + c) as f32 * 0.7 + phase).sin()).collect())
            .collect();
        RecordedFrame {
            id,
            descriptors: DescriptorMatrix::from_rows(rows).unwrap(),
            ignore: Vec::new(),
        }
    }

    fn matcher() -> Matcher {
        Matcher::new(&HalocConfig::new(2, 10).with_seed(5)).unwrap()
    }

    #[test]
    fn replay_detects_revisit() {
        let rec = Recording {
            frames: vec![frame(1, 0.0), frame(2, 1.0), frame(3, 2.0), frame(4, 0.0)],
        };
        let report = replay(
            &mut matcher(),
            &rec,
            &ReplayOptions {
                num_candidates: 1,
                ignore_recent: 0,
            },
        );
        assert_eq!(report.seed, 5);
        assert_eq!(report.frames[0].status, "no_result");
        assert_eq!(report.frames[3].status, "ok");
        assert_eq!(report.frames[3].candidates[0].id, 1);
    }

    #[test]
    fn replay_ignores_recent_frames() {
        let rec = Recording {
            frames: vec![frame(1, 0.0), frame(2, 1.0), frame(3, 1.0)],
        };
        let report = replay(
            &mut matcher(),
            &rec,
            &ReplayOptions {
                num_candidates: 5,
                ignore_recent: 1,
            },
        );
        // Frame 3 matches frame 2 exactly, but frame 2 is the previous frame.
        let ids: Vec<_> = report.frames[2].candidates.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn replay_reports_empty_frame() {
        let mut empty = frame(2, 0.0);
        empty.descriptors = DescriptorMatrix::default();
        let rec = Recording {
            frames: vec![frame(1, 0.0), empty],
        };
        let report = replay(
            &mut matcher(),
            &rec,
            &ReplayOptions {
                num_candidates: 1,
                ignore_recent: 0,
            },
        );
        assert_eq!(report.frames[1].status, "internal");
        assert!(report.frames[1].error.is_some());
    }
}
