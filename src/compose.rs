use std::collections::BTreeSet;

use crate::{
    compile::EffectInstance,
    core::{FrameIndex, FrameRange, Vec3},
    error::{EmberError, EmberResult},
    lifecycle::PhaseSchedule,
    material::{MaterialBank, MaterialDescriptor, MaterialKey},
};

/// Most instances allowed in an active (visible) phase at any single frame.
///
/// Exceeding the budget fails composition; instances are never silently
/// dropped or downgraded.
pub const MAX_SIMULTANEOUS: usize = 8;

/// Emitter family within one instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitterKind {
    Fire,
    Smoke,
    Debris,
}

/// One particle-emitter creation op at the engine boundary.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmitterOp {
    /// Stable id, `<spec_id>/<kind>`.
    pub id: String,
    pub spec_id: String,
    pub kind: EmitterKind,
    pub location: Vec3,
    pub particle_count: u32,
    /// Id of a descriptor in [`SceneMutationBatch::materials`].
    pub material: String,
    pub seed: u64,
}

/// Animated channel of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Visibility,
    Scale,
    Emission,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe {
    pub frame: FrameIndex,
    pub value: f64,
}

/// Keyframes for one channel, in strictly increasing frame order.
///
/// Interpolation between keys is an engine-binding detail; the boundary
/// values are the contract.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KeyframeTrack {
    pub channel: Channel,
    pub keys: Vec<Keyframe>,
}

impl KeyframeTrack {
    /// Step-hold evaluation: value of the last key at or before `frame`,
    /// 0.0 before the first key.
    pub fn value_step(&self, frame: FrameIndex) -> f64 {
        let mut value = 0.0;
        for k in &self.keys {
            if k.frame.0 > frame.0 {
                break;
            }
            value = k.value;
        }
        value
    }

    /// Piecewise-linear evaluation between neighboring keys.
    pub fn value_linear(&self, frame: FrameIndex) -> f64 {
        let Some(first) = self.keys.first() else {
            return 0.0;
        };
        if frame.0 <= first.frame.0 {
            return if frame.0 == first.frame.0 {
                first.value
            } else {
                0.0
            };
        }
        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if frame.0 < b.frame.0 {
                let span = (b.frame.0 - a.frame.0) as f64;
                let t = (frame.0 - a.frame.0) as f64 / span;
                return a.value + (b.value - a.value) * t;
            }
        }
        self.keys.last().map(|k| k.value).unwrap_or(0.0)
    }
}

/// Everything the scene gains from one compiled instance.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InstanceMutation {
    pub spec_id: String,
    pub schedule: PhaseSchedule,
    pub emitters: Vec<EmitterOp>,
    pub tracks: Vec<KeyframeTrack>,
}

/// The scene-mutation value produced by composition.
///
/// Compose/compile stay side-effect-free; an engine applies this batch once
/// before sampling.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneMutationBatch {
    pub frame_range: FrameRange,
    /// Deduplicated shared descriptors in stable key order.
    pub materials: Vec<MaterialDescriptor>,
    pub instances: Vec<InstanceMutation>,
}

impl SceneMutationBatch {
    /// Number of instances visibly contributing at `frame`.
    pub fn visible_count(&self, frame: FrameIndex) -> usize {
        self.instances
            .iter()
            .filter(|i| i.schedule.is_active(frame))
            .count()
    }
}

/// Merge compiled instances into one scene-mutation batch.
///
/// Runs single-threaded after all instances are compiled: the budget check
/// reasons about global temporal density. Only temporal density is bounded;
/// instances may freely overlap in space.
#[tracing::instrument(skip_all, fields(instances = instances.len()))]
pub fn compose(
    instances: &[EffectInstance],
    frame_range: FrameRange,
    materials: &MaterialBank,
) -> EmberResult<SceneMutationBatch> {
    enforce_budget(instances, frame_range)?;

    let mut keys = BTreeSet::<MaterialKey>::new();
    for inst in instances {
        keys.insert(inst.material_refs.fire);
        keys.insert(inst.material_refs.smoke);
        keys.insert(inst.material_refs.debris);
    }
    let mut descriptors = Vec::with_capacity(keys.len());
    for key in keys {
        let found = materials.get(key).ok_or_else(|| {
            EmberError::config(format!("material '{}' missing from bank", key.id()))
        })?;
        descriptors.push((*found).clone());
    }

    let mutations = instances.iter().map(instance_mutation).collect();

    Ok(SceneMutationBatch {
        frame_range,
        materials: descriptors,
        instances: mutations,
    })
}

fn enforce_budget(instances: &[EffectInstance], frame_range: FrameRange) -> EmberResult<()> {
    for f in frame_range.start.0..frame_range.end.0 {
        let frame = FrameIndex(f);
        let count = instances
            .iter()
            .filter(|i| i.schedule.is_active(frame))
            .count();
        if count > MAX_SIMULTANEOUS {
            return Err(EmberError::Budget { frame, count });
        }
    }
    Ok(())
}

fn instance_mutation(inst: &EffectInstance) -> InstanceMutation {
    let counts = inst.resolved_particle_counts;
    let emitters = vec![
        emitter(inst, EmitterKind::Fire, counts.fire, inst.material_refs.fire),
        // Smoke rises from the same source volume as the fire.
        emitter(inst, EmitterKind::Smoke, counts.fire, inst.material_refs.smoke),
        emitter(
            inst,
            EmitterKind::Debris,
            counts.debris,
            inst.material_refs.debris,
        ),
    ];

    InstanceMutation {
        spec_id: inst.spec_id.clone(),
        schedule: inst.schedule.clone(),
        emitters,
        tracks: keyframe_tracks(&inst.schedule),
    }
}

fn emitter(
    inst: &EffectInstance,
    kind: EmitterKind,
    particle_count: u32,
    material: MaterialKey,
) -> EmitterOp {
    let kind_name = match kind {
        EmitterKind::Fire => "fire",
        EmitterKind::Smoke => "smoke",
        EmitterKind::Debris => "debris",
    };
    EmitterOp {
        id: format!("{}/{kind_name}", inst.spec_id),
        spec_id: inst.spec_id.clone(),
        kind,
        location: inst.location,
        particle_count,
        material: material.id(),
        seed: inst.seed ^ (kind as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15),
    }
}

/// Keyframes at phase boundaries, with values sampled from the schedule so
/// empty phase windows fall out naturally.
fn keyframe_tracks(schedule: &PhaseSchedule) -> Vec<KeyframeTrack> {
    let start = schedule.start.0;
    let end = schedule.end().0;

    let mut boundary_frames = BTreeSet::new();
    boundary_frames.insert(start);
    boundary_frames.insert(start + schedule.rise_end);
    boundary_frames.insert(start + schedule.peak_end);
    boundary_frames.insert(end);

    let mut scale = Vec::with_capacity(boundary_frames.len());
    let mut emission = Vec::with_capacity(boundary_frames.len());
    for &f in &boundary_frames {
        let sample = schedule.sample(FrameIndex(f));
        scale.push(Keyframe {
            frame: FrameIndex(f),
            value: sample.scale,
        });
        emission.push(Keyframe {
            frame: FrameIndex(f),
            value: sample.emission,
        });
    }

    let mut visibility = Vec::with_capacity(3);
    if start > 0 {
        visibility.push(Keyframe {
            frame: FrameIndex(start - 1),
            value: 0.0,
        });
    }
    visibility.push(Keyframe {
        frame: FrameIndex(start),
        value: 1.0,
    });
    visibility.push(Keyframe {
        frame: FrameIndex(end),
        value: 0.0,
    });

    vec![
        KeyframeTrack {
            channel: Channel::Visibility,
            keys: visibility,
        },
        KeyframeTrack {
            channel: Channel::Scale,
            keys: scale,
        },
        KeyframeTrack {
            channel: Channel::Emission,
            keys: emission,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::model::QualityTier;
    use crate::model::test_fixtures::basic_spec;

    fn instance(id: &str, start: u64, duration: u64, bank: &MaterialBank) -> EffectInstance {
        let mut spec = basic_spec(id);
        spec.start_frame = start;
        spec.duration_frames = duration;
        compile(&spec, QualityTier::Medium, 1000, bank, 1).unwrap()
    }

    fn scene_range(end: u64) -> FrameRange {
        FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(end),
        }
    }

    #[test]
    fn nine_overlapping_instances_exceed_the_budget() {
        let bank = MaterialBank::new();
        let mut instances = Vec::new();
        // Eight running from frame 90; the ninth joins at frame 100.
        for i in 0..8 {
            instances.push(instance(&format!("a{i}"), 90, 40, &bank));
        }
        instances.push(instance("late", 100, 40, &bank));

        let err = compose(&instances, scene_range(200), &bank).unwrap_err();
        match err {
            EmberError::Budget { frame, count } => {
                assert_eq!(frame, FrameIndex(100));
                assert_eq!(count, 9);
            }
            other => panic!("expected Budget error, got {other}"),
        }
    }

    #[test]
    fn eight_simultaneous_instances_are_allowed() {
        let bank = MaterialBank::new();
        let instances: Vec<_> = (0..8)
            .map(|i| instance(&format!("a{i}"), 100, 40, &bank))
            .collect();
        let batch = compose(&instances, scene_range(200), &bank).unwrap();
        assert_eq!(batch.visible_count(FrameIndex(120)), 8);
    }

    #[test]
    fn dormant_and_removed_do_not_count_against_the_budget() {
        let bank = MaterialBank::new();
        let mut instances = Vec::new();
        // Nine instances, but never more than one active at a time.
        for i in 0..9u64 {
            instances.push(instance(&format!("a{i}"), i * 20, 10, &bank));
        }
        let batch = compose(&instances, scene_range(400), &bank).unwrap();
        assert_eq!(batch.visible_count(FrameIndex(5)), 1);
        assert_eq!(batch.visible_count(FrameIndex(15)), 0);
    }

    #[test]
    fn materials_are_deduplicated_in_stable_order() {
        let bank = MaterialBank::new();
        let instances: Vec<_> = (0..5)
            .map(|i| instance(&format!("a{i}"), (i as u64) * 30, 10, &bank))
            .collect();
        let batch = compose(&instances, scene_range(400), &bank).unwrap();
        assert_eq!(batch.materials.len(), 3);
        let ids: Vec<_> = batch.materials.iter().map(|m| m.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn keyframes_cover_the_phase_boundaries() {
        let bank = MaterialBank::new();
        let inst = instance("a0", 140, 20, &bank);
        let batch = compose(std::slice::from_ref(&inst), scene_range(400), &bank).unwrap();
        let tracks = &batch.instances[0].tracks;

        let scale = tracks
            .iter()
            .find(|t| t.channel == Channel::Scale)
            .unwrap();
        // Boundaries: 140 (rise start), 147 (peak start), 150 (fade start), 160 (end).
        let frames: Vec<u64> = scale.keys.iter().map(|k| k.frame.0).collect();
        assert_eq!(frames, vec![140, 147, 150, 160]);
        assert_eq!(scale.keys[0].value, 0.0);
        assert_eq!(scale.keys[1].value, inst.schedule.peak_scale);
        assert_eq!(scale.keys[2].value, inst.schedule.peak_scale);
        assert_eq!(scale.keys[3].value, 0.0);

        let vis = tracks
            .iter()
            .find(|t| t.channel == Channel::Visibility)
            .unwrap();
        assert_eq!(vis.value_step(FrameIndex(139)), 0.0);
        assert_eq!(vis.value_step(FrameIndex(140)), 1.0);
        assert_eq!(vis.value_step(FrameIndex(159)), 1.0);
        assert_eq!(vis.value_step(FrameIndex(160)), 0.0);
    }

    #[test]
    fn linear_track_interpolates_between_keys() {
        let track = KeyframeTrack {
            channel: Channel::Scale,
            keys: vec![
                Keyframe {
                    frame: FrameIndex(10),
                    value: 0.0,
                },
                Keyframe {
                    frame: FrameIndex(20),
                    value: 1.0,
                },
            ],
        };
        assert_eq!(track.value_linear(FrameIndex(10)), 0.0);
        assert_eq!(track.value_linear(FrameIndex(15)), 0.5);
        assert_eq!(track.value_linear(FrameIndex(20)), 1.0);
        assert_eq!(track.value_linear(FrameIndex(99)), 1.0);
        assert_eq!(track.value_linear(FrameIndex(5)), 0.0);
    }
}
