use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use xxhash_rust::xxh3::xxh3_64;

use crate::{
    compose::SceneMutationBatch,
    core::FrameIndex,
    engine::SceneEngine,
    error::EmberResult,
};

/// Measurements for one sampled frame.
///
/// `wall_clock_seconds` is `None` when the frame failed (engine error or
/// per-frame timeout); failed frames never abort the remaining samples.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderMetric {
    pub frame: FrameIndex,
    pub wall_clock_seconds: Option<f64>,
    pub output_bytes: u64,
    pub visible_instances: u32,
    /// xxh3 of the artifact bytes; the validation exact-match fast path.
    pub content_hash: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
}

impl RenderMetric {
    /// `true` when this frame's render failed.
    pub fn failed(&self) -> bool {
        self.wall_clock_seconds.is_none()
    }
}

/// Options for a sampling run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunnerOpts {
    /// Record a frame as failed when its measured render time reaches this.
    pub timeout_seconds: Option<f64>,
}

/// Bookkeeping for one sampling run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleStats {
    pub frames_total: u64,
    pub frames_failed: u64,
}

/// Metrics plus stats for one sampling run.
#[derive(Clone, Debug)]
pub struct SampleRun {
    pub metrics: Vec<RenderMetric>,
    pub stats: SampleStats,
}

/// Pick representative frames: the midpoint of each non-empty
/// Rising/Peak/Fading window of each instance, deduplicated and sorted.
pub fn select_sample_frames(batch: &SceneMutationBatch) -> Vec<FrameIndex> {
    let mut frames = BTreeSet::new();
    for inst in &batch.instances {
        let s = &inst.schedule;
        let windows = [
            (0, s.rise_end),
            (s.rise_end, s.peak_end),
            (s.peak_end, s.duration_frames),
        ];
        for (lo, hi) in windows {
            if lo < hi {
                frames.insert(FrameIndex(s.start.0 + (lo + hi) / 2));
            }
        }
    }
    frames.into_iter().collect()
}

/// Apply a composed batch to the engine once, then sample the given frames.
///
/// Each frame is timed independently; a failed frame is recorded and
/// sampling continues. Only applying the batch itself can fail the run.
#[tracing::instrument(skip_all, fields(frames = frames.len()))]
pub fn sample(
    engine: &mut dyn SceneEngine,
    batch: &SceneMutationBatch,
    frames: &[FrameIndex],
    opts: RunnerOpts,
) -> EmberResult<SampleRun> {
    engine.apply(batch)?;

    let mut metrics = Vec::with_capacity(frames.len());
    let mut stats = SampleStats {
        frames_total: frames.len() as u64,
        frames_failed: 0,
    };

    for &frame in frames {
        let visible_instances = batch.visible_count(frame) as u32;
        let started = Instant::now();
        match engine.render_frame(frame) {
            Ok(rendered) => {
                let elapsed = started.elapsed().as_secs_f64();
                let timed_out = opts.timeout_seconds.is_some_and(|limit| elapsed >= limit);
                if timed_out {
                    tracing::warn!(frame = frame.0, elapsed, "frame render exceeded timeout");
                    stats.frames_failed += 1;
                    metrics.push(failed_metric(frame, visible_instances));
                    continue;
                }
                metrics.push(RenderMetric {
                    frame,
                    wall_clock_seconds: Some(elapsed),
                    output_bytes: rendered.data.len() as u64,
                    visible_instances,
                    content_hash: Some(xxh3_64(&rendered.data)),
                    artifact_path: rendered.artifact_path,
                });
            }
            Err(e) => {
                tracing::warn!(frame = frame.0, error = %e, "frame render failed");
                stats.frames_failed += 1;
                metrics.push(failed_metric(frame, visible_instances));
            }
        }
    }

    Ok(SampleRun { metrics, stats })
}

fn failed_metric(frame: FrameIndex, visible_instances: u32) -> RenderMetric {
    RenderMetric {
        frame,
        wall_clock_seconds: None,
        output_bytes: 0,
        visible_instances,
        content_hash: None,
        artifact_path: None,
    }
}
