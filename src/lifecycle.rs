use crate::core::FrameIndex;
use crate::ease::Ease;

/// Floor for the peak display scale, so `intensity -> 0` still produces a
/// visible effect (the particle-count floor's counterpart).
pub const MIN_PEAK_SCALE: f64 = 0.05;

/// One segment of an effect's temporal lifecycle.
///
/// Strictly monotonic and non-reentrant: an instance only ever moves forward
/// through `Dormant -> Rising -> Peak -> Fading -> Removed`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Dormant,
    Rising,
    Peak,
    Fading,
    Removed,
}

impl Phase {
    /// `true` for the phases that contribute visibly to the scene.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Rising | Self::Peak | Self::Fading)
    }
}

/// The lifecycle sampled at one absolute frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct PhaseSample {
    pub phase: Phase,
    pub visible: bool,
    /// Display scale in `[0, peak_scale]`.
    pub scale: f64,
    /// Emission factor in `[0, 1]`; 1.0 only during `Peak`.
    pub emission: f64,
}

/// An instance's compiled phase timing, anchored at its spec's start frame.
///
/// Phase boundaries are integer frame counts relative to `start`:
/// Rising is `[0, rise_end)`, Peak `[rise_end, peak_end)`, Fading
/// `[peak_end, duration_frames)`. Sampling is a pure function of
/// `(schedule, frame)`; the schedule holds no mutable state.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PhaseSchedule {
    pub start: FrameIndex,
    pub duration_frames: u64,
    /// Relative exclusive end of Rising (35% of duration).
    pub rise_end: u64,
    /// Relative exclusive end of Peak (50% of duration).
    pub peak_end: u64,
    pub peak_scale: f64,
}

impl PhaseSchedule {
    /// Build a schedule for an effect starting at `start` and lasting
    /// `duration_frames` (> 0, enforced upstream by spec validation).
    pub fn new(start: FrameIndex, duration_frames: u64, intensity: f64) -> Self {
        Self {
            start,
            duration_frames,
            rise_end: duration_frames * 35 / 100,
            peak_end: duration_frames * 50 / 100,
            peak_scale: intensity.max(MIN_PEAK_SCALE),
        }
    }

    /// Exclusive end frame in absolute timeline space.
    pub fn end(&self) -> FrameIndex {
        FrameIndex(self.start.0 + self.duration_frames)
    }

    /// Phase at an absolute frame.
    pub fn phase_at(&self, frame: FrameIndex) -> Phase {
        if frame.0 < self.start.0 {
            return Phase::Dormant;
        }
        let rel = frame.0 - self.start.0;
        if rel >= self.duration_frames {
            Phase::Removed
        } else if rel < self.rise_end {
            Phase::Rising
        } else if rel < self.peak_end {
            Phase::Peak
        } else {
            Phase::Fading
        }
    }

    /// `true` when the instance contributes visibly at `frame` (and so counts
    /// against the simultaneous-instance budget).
    pub fn is_active(&self, frame: FrameIndex) -> bool {
        self.phase_at(frame).is_active()
    }

    /// Sample the lifecycle at an absolute frame.
    pub fn sample(&self, frame: FrameIndex) -> PhaseSample {
        let phase = self.phase_at(frame);
        let (scale, emission) = match phase {
            Phase::Dormant | Phase::Removed => (0.0, 0.0),
            Phase::Rising => {
                let rel = frame.0 - self.start.0;
                let p = rel as f64 / self.rise_end as f64;
                let ramp = Ease::OutQuad.apply(p);
                (self.peak_scale * ramp, ramp)
            }
            Phase::Peak => (self.peak_scale, 1.0),
            Phase::Fading => {
                let rel = frame.0 - self.start.0;
                let fade_len = self.duration_frames - self.peak_end;
                let p = (rel - self.peak_end) as f64 / fade_len as f64;
                let scale = self.peak_scale * (1.0 - Ease::InQuad.apply(p));
                let emission = (1.0 - p) * (1.0 - p);
                (scale, emission)
            }
        };
        PhaseSample {
            phase,
            visible: phase.is_active(),
            scale,
            emission,
        }
    }
}
