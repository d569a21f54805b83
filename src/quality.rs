use crate::model::QualityTier;

/// Concrete generation parameters derived from a [`QualityTier`].
///
/// Profiles are fixed constants, totally ordered by cost
/// (`quick < medium < high`), and are never mutated at runtime.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QualityProfile {
    /// Renderer sample count per pixel.
    pub sample_count: u32,
    /// Multiplier applied to per-spec particle hints.
    pub particle_multiplier: f64,
    /// Output resolution scale in (0, 1].
    pub resolution_scale: f64,
    /// Volumetric light bounce cap.
    pub max_volume_bounces: u32,
}

const QUICK: QualityProfile = QualityProfile {
    sample_count: 16,
    particle_multiplier: 0.5,
    resolution_scale: 0.5,
    max_volume_bounces: 0,
};

const MEDIUM: QualityProfile = QualityProfile {
    sample_count: 64,
    particle_multiplier: 1.0,
    resolution_scale: 0.75,
    max_volume_bounces: 2,
};

const HIGH: QualityProfile = QualityProfile {
    sample_count: 256,
    particle_multiplier: 1.5,
    resolution_scale: 1.0,
    max_volume_bounces: 4,
};

/// Resolve a tier to its generation parameters.
///
/// Total function: every tier has a profile and there is no failure mode.
pub fn resolve(tier: QualityTier) -> QualityProfile {
    match tier {
        QualityTier::Quick => QUICK,
        QualityTier::Medium => MEDIUM,
        QualityTier::High => HIGH,
    }
}
