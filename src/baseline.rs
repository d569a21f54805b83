use std::path::Path;

use crate::{
    core::FrameIndex,
    error::{EmberError, EmberResult},
    render_job::RenderMetric,
};

/// A previously approved rendered frame: the ground truth for regression
/// comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReferenceFrame {
    pub frame: FrameIndex,
    pub content_hash: u64,
    pub output_bytes: u64,
}

/// The approved baseline for a scene, serialized as a JSON document.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BaselineSet {
    pub frames: Vec<ReferenceFrame>,
}

impl BaselineSet {
    /// Capture a new baseline from the current run's metrics.
    ///
    /// Failed frames are skipped. Capturing is an explicit operator action,
    /// never automatic.
    pub fn capture(metrics: &[RenderMetric]) -> Self {
        let mut frames: Vec<ReferenceFrame> = metrics
            .iter()
            .filter_map(|m| {
                let content_hash = m.content_hash?;
                Some(ReferenceFrame {
                    frame: m.frame,
                    content_hash,
                    output_bytes: m.output_bytes,
                })
            })
            .collect();
        frames.sort_by_key(|f| f.frame);
        Self { frames }
    }

    /// Look up the reference for a frame.
    pub fn get(&self, frame: FrameIndex) -> Option<&ReferenceFrame> {
        self.frames.iter().find(|f| f.frame == frame)
    }

    /// Load a baseline document from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> EmberResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EmberError::config(format!("read baseline '{}': {e}", path.display())))?;
        serde_json::from_str(&text).map_err(|e| EmberError::serde(e.to_string()))
    }

    /// Write the baseline document as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> EmberResult<()> {
        let path = path.as_ref();
        let text =
            serde_json::to_string_pretty(self).map_err(|e| EmberError::serde(e.to_string()))?;
        std::fs::write(path, text)
            .map_err(|e| EmberError::config(format!("write baseline '{}': {e}", path.display())))
    }
}
