use std::fmt::Write as _;

use crate::{baseline::BaselineSet, render_job::RenderMetric};

/// Gate thresholds for a validation run.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Thresholds {
    /// Minimum fraction of baseline-comparable frames that must pass.
    pub min_pass_rate: f64,
    /// Per-frame and average render-time budget in seconds.
    pub max_seconds_per_frame: f64,
    /// Byte-size-ratio floor used when content hashes differ.
    pub min_size_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_pass_rate: 0.8,
            max_seconds_per_frame: 30.0,
            min_size_ratio: 0.9,
        }
    }
}

/// Why one sampled frame failed validation.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// No approved reference exists for this frame.
    NoBaseline,
    /// The frame's render failed (engine error or timeout).
    RenderFailed,
    /// Content differs from the baseline beyond tolerance.
    ContentMismatch {
        expected_hash: u64,
        actual_hash: u64,
        size_ratio: f64,
    },
    /// The frame rendered but blew the per-frame time budget.
    TooSlow { seconds: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameFailure {
    pub frame: crate::core::FrameIndex,
    pub reason: FailureReason,
}

/// The machine-readable gate downstream tooling branches on.
///
/// A failing verdict is the expected structured negative-path value, not an
/// error.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidationVerdict {
    pub pass: bool,
    /// `passed / baseline-comparable frames`; frames without a baseline are
    /// excluded from the rate but flagged.
    pub pass_rate: f64,
    /// Mean wall-clock seconds over successfully rendered frames.
    pub avg_render_seconds: f64,
    pub failures: Vec<FrameFailure>,
}

impl ValidationVerdict {
    /// Human-readable per-frame failure table plus the summary line.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "verdict: {}  pass_rate: {:.3}  avg_render_seconds: {:.3}",
            if self.pass { "PASS" } else { "FAIL" },
            self.pass_rate,
            self.avg_render_seconds
        );
        if self.failures.is_empty() {
            return out;
        }
        let _ = writeln!(out, "{:>8}  failure", "frame");
        for f in &self.failures {
            let detail = match f.reason {
                FailureReason::NoBaseline => "no baseline for frame".to_string(),
                FailureReason::RenderFailed => "render failed".to_string(),
                FailureReason::ContentMismatch {
                    expected_hash,
                    actual_hash,
                    size_ratio,
                } => format!(
                    "content mismatch: expected {expected_hash:016x}, got {actual_hash:016x} (size ratio {size_ratio:.3})"
                ),
                FailureReason::TooSlow { seconds } => {
                    format!("render took {seconds:.3}s")
                }
            };
            let _ = writeln!(out, "{:>8}  {detail}", f.frame.0);
        }
        out
    }
}

/// Compare sampled metrics against the approved baseline and the
/// performance budget.
///
/// Per frame: content-hash equality is the exact-match fast path; when
/// hashes differ the byte-size ratio must clear `min_size_ratio`. Render
/// time must stay under `max_seconds_per_frame` both per frame and on
/// average. Deterministic: identical inputs yield an identical verdict.
#[tracing::instrument(skip_all, fields(frames = metrics.len()))]
pub fn validate(
    metrics: &[RenderMetric],
    baseline: &BaselineSet,
    thresholds: &Thresholds,
) -> ValidationVerdict {
    let mut failures = Vec::new();
    let mut comparable = 0usize;
    let mut passed = 0usize;

    let mut time_sum = 0.0;
    let mut time_count = 0usize;

    for m in metrics {
        if let Some(secs) = m.wall_clock_seconds {
            time_sum += secs;
            time_count += 1;
        }

        let Some(reference) = baseline.get(m.frame) else {
            failures.push(FrameFailure {
                frame: m.frame,
                reason: FailureReason::NoBaseline,
            });
            continue;
        };
        comparable += 1;

        let Some(secs) = m.wall_clock_seconds else {
            failures.push(FrameFailure {
                frame: m.frame,
                reason: FailureReason::RenderFailed,
            });
            continue;
        };

        let ratio = size_ratio(m.output_bytes, reference.output_bytes);
        let exact = m.content_hash == Some(reference.content_hash);
        if !exact && ratio < thresholds.min_size_ratio {
            failures.push(FrameFailure {
                frame: m.frame,
                reason: FailureReason::ContentMismatch {
                    expected_hash: reference.content_hash,
                    actual_hash: m.content_hash.unwrap_or(0),
                    size_ratio: ratio,
                },
            });
            continue;
        }

        if secs > thresholds.max_seconds_per_frame {
            failures.push(FrameFailure {
                frame: m.frame,
                reason: FailureReason::TooSlow { seconds: secs },
            });
            continue;
        }

        passed += 1;
    }

    let pass_rate = if comparable == 0 {
        0.0
    } else {
        passed as f64 / comparable as f64
    };
    let avg_render_seconds = if time_count == 0 {
        0.0
    } else {
        time_sum / time_count as f64
    };

    ValidationVerdict {
        pass: pass_rate >= thresholds.min_pass_rate
            && avg_render_seconds <= thresholds.max_seconds_per_frame,
        pass_rate,
        avg_render_seconds,
        failures,
    }
}

fn size_ratio(a: u64, b: u64) -> f64 {
    if a == 0 || b == 0 {
        return 0.0;
    }
    let (lo, hi) = (a.min(b), a.max(b));
    lo as f64 / hi as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FrameIndex;

    fn metric(frame: u64, secs: Option<f64>, bytes: u64, hash: Option<u64>) -> RenderMetric {
        RenderMetric {
            frame: FrameIndex(frame),
            wall_clock_seconds: secs,
            output_bytes: bytes,
            visible_instances: 1,
            content_hash: hash,
            artifact_path: None,
        }
    }

    fn baseline_of(metrics: &[RenderMetric]) -> BaselineSet {
        BaselineSet::capture(metrics)
    }

    #[test]
    fn one_slow_outlier_among_nine_still_passes() {
        let mut metrics: Vec<_> = (0..9)
            .map(|i| metric(i * 10, Some(0.5), 1000, Some(i)))
            .collect();
        let baseline = baseline_of(&metrics);
        // Frame 80 blows the per-frame budget but not the average.
        metrics[8].wall_clock_seconds = Some(40.0);

        let verdict = validate(&metrics, &baseline, &Thresholds::default());
        assert!((verdict.pass_rate - 8.0 / 9.0).abs() < 1e-9);
        assert!(verdict.avg_render_seconds <= 30.0);
        assert!(verdict.pass);
        assert_eq!(verdict.failures.len(), 1);
        assert!(matches!(
            verdict.failures[0].reason,
            FailureReason::TooSlow { .. }
        ));
    }

    #[test]
    fn validation_is_idempotent() {
        let metrics: Vec<_> = (0..4)
            .map(|i| metric(i * 5, Some(0.1), 500 + i, Some(i * 7)))
            .collect();
        let baseline = baseline_of(&metrics);
        let a = validate(&metrics, &baseline, &Thresholds::default());
        let b = validate(&metrics, &baseline, &Thresholds::default());
        assert_eq!(a, b);
    }

    #[test]
    fn frames_without_baseline_are_flagged_but_excluded_from_the_rate() {
        let known = metric(10, Some(0.1), 1000, Some(1));
        let unknown = metric(99, Some(0.1), 1000, Some(2));
        let baseline = baseline_of(std::slice::from_ref(&known));

        let verdict = validate(&[known, unknown], &baseline, &Thresholds::default());
        assert_eq!(verdict.pass_rate, 1.0);
        assert!(verdict.pass);
        assert_eq!(verdict.failures.len(), 1);
        assert_eq!(verdict.failures[0].reason, FailureReason::NoBaseline);
    }

    #[test]
    fn size_ratio_heuristic_rescues_near_identical_output() {
        let approved = metric(10, Some(0.1), 1000, Some(1));
        let baseline = baseline_of(std::slice::from_ref(&approved));
        // Different hash, 95% of the approved size: inside tolerance.
        let close = metric(10, Some(0.1), 950, Some(2));
        let verdict = validate(&[close], &baseline, &Thresholds::default());
        assert!(verdict.pass);

        // Different hash, half the size: rejected.
        let far = metric(10, Some(0.1), 500, Some(2));
        let verdict = validate(&[far], &baseline, &Thresholds::default());
        assert!(!verdict.pass);
        assert!(matches!(
            verdict.failures[0].reason,
            FailureReason::ContentMismatch { .. }
        ));
    }

    #[test]
    fn failed_renders_fail_their_frame() {
        let good = metric(10, Some(0.1), 1000, Some(1));
        let baseline = baseline_of(&[good.clone(), metric(20, Some(0.1), 1000, Some(2))]);
        let failed = metric(20, None, 0, None);

        let verdict = validate(&[good, failed], &baseline, &Thresholds::default());
        assert_eq!(verdict.pass_rate, 0.5);
        assert!(!verdict.pass);
        assert_eq!(verdict.failures[0].reason, FailureReason::RenderFailed);
    }

    #[test]
    fn no_comparable_frames_fails_the_run() {
        let metrics = [metric(10, Some(0.1), 1000, Some(1))];
        let verdict = validate(&metrics, &BaselineSet::default(), &Thresholds::default());
        assert_eq!(verdict.pass_rate, 0.0);
        assert!(!verdict.pass);
    }

    #[test]
    fn report_names_each_failing_frame() {
        let approved = metric(10, Some(0.1), 1000, Some(1));
        let baseline = baseline_of(std::slice::from_ref(&approved));
        let bad = metric(10, Some(0.1), 100, Some(2));
        let verdict = validate(&[bad], &baseline, &Thresholds::default());
        let report = verdict.report();
        assert!(report.contains("FAIL"));
        assert!(report.contains("10"));
        assert!(report.contains("content mismatch"));
    }
}
