use rayon::prelude::*;

use crate::{
    core::{FrameIndex, Vec3},
    error::EmberResult,
    lifecycle::PhaseSchedule,
    material::{MaterialBank, MaterialKey, MaterialKind},
    model::{EffectBatch, EffectSpec, QualityTier},
    quality,
};

/// Particle counts resolved from hints, tier multiplier and intensity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParticleCounts {
    pub fire: u32,
    pub debris: u32,
}

/// Keys of the three shared materials an instance draws with.
///
/// These reference the shared [`MaterialBank`]; instances never own
/// descriptor copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MaterialRefs {
    pub fire: MaterialKey,
    pub smoke: MaterialKey,
    pub debris: MaterialKey,
}

/// A fully-parameterized effect compiled from one [`EffectSpec`].
///
/// Immutable after compilation; a new run produces a new instance set.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EffectInstance {
    /// Back-reference to the originating spec (not ownership).
    pub spec_id: String,
    pub location: Vec3,
    pub resolved_particle_counts: ParticleCounts,
    pub material_refs: MaterialRefs,
    pub schedule: PhaseSchedule,
    /// Deterministic per-instance seed derived from the batch seed.
    pub seed: u64,
}

/// Compile one spec against its effective tier.
///
/// Pure apart from the material-cache lookup (which may synthesize a shared
/// descriptor on first use). Compiling one spec never reads another's
/// instance, so batch compilation parallelizes freely.
pub fn compile(
    spec: &EffectSpec,
    tier: QualityTier,
    scene_frames: u64,
    materials: &MaterialBank,
    batch_seed: u64,
) -> EmberResult<EffectInstance> {
    spec.validate(scene_frames)?;

    let profile = quality::resolve(tier);
    let resolved_particle_counts = ParticleCounts {
        fire: resolve_count(spec.fire_particle_hint, profile.particle_multiplier, spec.intensity),
        debris: resolve_count(
            spec.debris_particle_hint,
            profile.particle_multiplier,
            spec.intensity,
        ),
    };

    let fire = materials.get_or_create(MaterialKind::Fire, spec.color_bias, tier);
    let smoke = materials.get_or_create(MaterialKind::Smoke, spec.color_bias, tier);
    let debris = materials.get_or_create(MaterialKind::Debris, spec.color_bias, tier);

    Ok(EffectInstance {
        spec_id: spec.id.clone(),
        location: spec.location,
        resolved_particle_counts,
        material_refs: MaterialRefs {
            fire: fire.key,
            smoke: smoke.key,
            debris: debris.key,
        },
        schedule: PhaseSchedule::new(
            FrameIndex(spec.start_frame),
            spec.duration_frames,
            spec.intensity,
        ),
        seed: stable_hash64(batch_seed, &spec.id),
    })
}

/// Compile a whole batch, failing fast on the first invalid spec.
///
/// Specs compile in parallel; the material bank is the only shared state.
#[tracing::instrument(skip_all, fields(specs = batch.specs.len()))]
pub fn compile_batch(
    batch: &EffectBatch,
    materials: &MaterialBank,
) -> EmberResult<Vec<EffectInstance>> {
    batch.validate()?;
    batch
        .specs
        .par_iter()
        .map(|spec| {
            compile(
                spec,
                batch.tier_for(spec),
                batch.settings.duration_frames,
                materials,
                batch.seed,
            )
        })
        .collect()
}

/// `round(hint * multiplier * intensity)`, floored at 1 so the effect stays
/// visible even as intensity approaches zero.
fn resolve_count(hint: u32, multiplier: f64, intensity: f64) -> u32 {
    let n = (f64::from(hint) * multiplier * intensity).round();
    (n as u32).max(1)
}

fn stable_hash64(seed: u64, s: &str) -> u64 {
    // FNV-1a 64, seeded.
    let mut h = 0xcbf2_9ce4_8422_2325u64 ^ seed;
    for &b in s.as_bytes() {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0000_0100_0000_01B3);
    }
    h
}
