use crate::{
    core::Vec3,
    error::{EmberError, EmberResult},
    model::{ColorBias, EffectBatch, EffectSpec, QualityTier, RenderSettings},
};

/// Consuming builder for an [`EffectBatch`].
///
/// JSON is supported via Serde; for programmatic batch construction prefer
/// the builders, which validate on `build`.
pub struct BatchBuilder {
    settings: RenderSettings,
    seed: u64,
    specs: Vec<EffectSpec>,
}

impl BatchBuilder {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            seed: 0,
            specs: Vec::new(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Append a spec; duplicate ids are rejected immediately.
    pub fn spec(mut self, spec: EffectSpec) -> EmberResult<Self> {
        if self.specs.iter().any(|s| s.id == spec.id) {
            return Err(EmberError::config(format!(
                "duplicate spec id '{}'",
                spec.id
            )));
        }
        self.specs.push(spec);
        Ok(self)
    }

    pub fn build(self) -> EmberResult<EffectBatch> {
        let batch = EffectBatch {
            settings: self.settings,
            specs: self.specs,
            seed: self.seed,
        };
        batch.validate()?;
        Ok(batch)
    }
}

/// Consuming builder for one [`EffectSpec`].
pub struct SpecBuilder {
    id: String,
    name: String,
    location: Vec3,
    start_frame: u64,
    duration_frames: u64,
    intensity: f64,
    quality_tier: Option<QualityTier>,
    fire_particle_hint: u32,
    debris_particle_hint: u32,
    color_bias: ColorBias,
}

impl SpecBuilder {
    pub fn new(id: impl Into<String>, start_frame: u64, duration_frames: u64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            location: Vec3::ZERO,
            start_frame,
            duration_frames,
            intensity: 1.0,
            quality_tier: None,
            fire_particle_hint: 30,
            debris_particle_hint: 10,
            color_bias: ColorBias::Orange,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn location(mut self, location: Vec3) -> Self {
        self.location = location;
        self
    }

    pub fn intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn quality_tier(mut self, tier: QualityTier) -> Self {
        self.quality_tier = Some(tier);
        self
    }

    pub fn fire_particle_hint(mut self, hint: u32) -> Self {
        self.fire_particle_hint = hint;
        self
    }

    pub fn debris_particle_hint(mut self, hint: u32) -> Self {
        self.debris_particle_hint = hint;
        self
    }

    pub fn color_bias(mut self, bias: ColorBias) -> Self {
        self.color_bias = bias;
        self
    }

    pub fn build(self) -> EmberResult<EffectSpec> {
        if self.id.trim().is_empty() {
            return Err(EmberError::config("spec id must be non-empty"));
        }
        Ok(EffectSpec {
            id: self.id,
            name: self.name,
            location: self.location,
            start_frame: self.start_frame,
            duration_frames: self.duration_frames,
            intensity: self.intensity,
            quality_tier: self.quality_tier,
            fire_particle_hint: self.fire_particle_hint,
            debris_particle_hint: self.debris_particle_hint,
            color_bias: self.color_bias,
        })
    }
}
