use std::path::Path;

use crate::{
    core::{Fps, FrameIndex, FrameRange, Resolution, Vec3},
    error::{EmberError, EmberResult},
};

/// Inclusive bounds for `EffectSpec::fire_particle_hint`.
pub const FIRE_HINT_RANGE: (u32, u32) = (10, 50);
/// Inclusive bounds for `EffectSpec::debris_particle_hint`.
pub const DEBRIS_HINT_RANGE: (u32, u32) = (5, 20);
/// Maximum allowed `EffectSpec::intensity`.
pub const INTENSITY_MAX: f64 = 2.0;

/// Named cost/fidelity level. Tiers are code, not configuration; adding one
/// is a code change so cost budgets cannot drift silently.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Quick,
    Medium,
    High,
}

impl QualityTier {
    /// Stable lowercase name, used in material ids and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Dominant color family of an effect's fire gradient.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ColorBias {
    Orange,
    Red,
    Yellow,
    Blue,
    Green,
}

impl ColorBias {
    /// Stable lowercase name, used in material ids.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orange => "orange",
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }
}

/// Author-declared description of one explosion-like effect.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EffectSpec {
    pub id: String,
    pub name: String,
    pub location: Vec3,
    pub start_frame: u64,
    pub duration_frames: u64,
    pub intensity: f64, // 0..=2
    /// Per-spec tier override; `None` falls back to the batch default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_tier: Option<QualityTier>,
    pub fire_particle_hint: u32,
    pub debris_particle_hint: u32,
    pub color_bias: ColorBias,
}

impl EffectSpec {
    /// Check every per-spec invariant against the scene's total frame range.
    ///
    /// Violations fail the whole batch; specs are never clamped.
    pub fn validate(&self, scene_frames: u64) -> EmberResult<()> {
        if self.id.trim().is_empty() {
            return Err(EmberError::spec(&self.id, "id must be non-empty"));
        }
        if self.duration_frames == 0 {
            return Err(EmberError::spec(&self.id, "duration_frames must be > 0"));
        }
        let end = self
            .start_frame
            .checked_add(self.duration_frames)
            .ok_or_else(|| EmberError::spec(&self.id, "start_frame + duration_frames overflows"))?;
        if end > scene_frames {
            return Err(EmberError::spec(
                &self.id,
                format!(
                    "start_frame + duration_frames ({end}) exceeds scene frame range ({scene_frames})"
                ),
            ));
        }
        if !self.intensity.is_finite() || self.intensity < 0.0 || self.intensity > INTENSITY_MAX {
            return Err(EmberError::spec(
                &self.id,
                format!("intensity must be within [0, {INTENSITY_MAX}]"),
            ));
        }
        if self.fire_particle_hint < FIRE_HINT_RANGE.0
            || self.fire_particle_hint > FIRE_HINT_RANGE.1
        {
            return Err(EmberError::spec(
                &self.id,
                format!(
                    "fire_particle_hint must be within [{}, {}]",
                    FIRE_HINT_RANGE.0, FIRE_HINT_RANGE.1
                ),
            ));
        }
        if self.debris_particle_hint < DEBRIS_HINT_RANGE.0
            || self.debris_particle_hint > DEBRIS_HINT_RANGE.1
        {
            return Err(EmberError::spec(
                &self.id,
                format!(
                    "debris_particle_hint must be within [{}, {}]",
                    DEBRIS_HINT_RANGE.0, DEBRIS_HINT_RANGE.1
                ),
            ));
        }
        Ok(())
    }
}

/// Global render settings shared by every spec in a batch.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RenderSettings {
    /// Tier applied to specs without a per-spec override.
    pub quality_default: QualityTier,
    pub resolution: Resolution,
    pub fps: Fps,
    /// Host engine name, passed through to the engine adapter.
    pub engine: String,
    /// Total scene frame range; no effect may extend past it.
    pub duration_frames: u64,
}

/// The user-authored input document: settings plus a list of effect specs.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EffectBatch {
    pub settings: RenderSettings,
    pub specs: Vec<EffectSpec>,
    /// Global determinism seed; per-emitter seeds derive from it.
    #[serde(default)]
    pub seed: u64,
}

impl EffectBatch {
    /// Load and schema-validate a batch document from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> EmberResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EmberError::config(format!("read batch '{}': {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Parse and schema-validate a batch document from a JSON string.
    pub fn from_json(text: &str) -> EmberResult<Self> {
        let batch: Self =
            serde_json::from_str(text).map_err(|e| EmberError::serde(e.to_string()))?;
        batch.validate()?;
        Ok(batch)
    }

    /// Run the full boundary schema validation pass.
    ///
    /// All violations are collected and reported together; nothing is
    /// compiled when this fails.
    pub fn validate(&self) -> EmberResult<()> {
        crate::schema::validate_batch(self).map_err(|e| EmberError::config(e.to_string()))
    }

    /// Effective tier for one spec (per-spec override or batch default).
    pub fn tier_for(&self, spec: &EffectSpec) -> QualityTier {
        spec.quality_tier.unwrap_or(self.settings.quality_default)
    }

    /// The scene's full frame range `[0, duration_frames)`.
    pub fn frame_range(&self) -> FrameRange {
        FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(self.settings.duration_frames),
        }
    }
}
