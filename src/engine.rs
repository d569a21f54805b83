use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::{
    compose::{Channel, EmitterKind, EmitterOp, KeyframeTrack, SceneMutationBatch},
    core::{FrameIndex, Vec3},
    error::{EmberError, EmberResult},
    material::MaterialDescriptor,
};

/// One rendered frame returned from a host engine.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    /// Where the artifact was written, when the engine persists to disk.
    pub artifact_path: Option<PathBuf>,
    /// Artifact bytes, used for size and content-hash metrics.
    pub data: Vec<u8>,
}

/// The four-operation capability contract the pipeline requires from its
/// host 3D scene engine.
///
/// The pipeline never depends on engine-specific shading internals; an
/// adapter translates [`MaterialDescriptor`]s and keyframe tracks into the
/// engine's native representation. Most callers use the provided
/// [`SceneEngine::apply`] to replay a composed batch, then render frames.
pub trait SceneEngine {
    /// Create a volumetric/emissive material from a procedural descriptor.
    fn create_material(&mut self, desc: &MaterialDescriptor) -> EmberResult<()>;

    /// Create a particle emitter at a location with a count and material ref.
    fn create_emitter(&mut self, op: &EmitterOp) -> EmberResult<()>;

    /// Set visibility/scale/emission keyframes for one instance.
    fn set_keyframes(&mut self, spec_id: &str, track: &KeyframeTrack) -> EmberResult<()>;

    /// Render a specific frame to an image artifact.
    fn render_frame(&mut self, frame: FrameIndex) -> EmberResult<RenderedFrame>;

    /// Replay a composed scene-mutation batch in order.
    fn apply(&mut self, batch: &SceneMutationBatch) -> EmberResult<()> {
        for m in &batch.materials {
            self.create_material(m)?;
        }
        for inst in &batch.instances {
            for e in &inst.emitters {
                self.create_emitter(e)?;
            }
            for t in &inst.tracks {
                self.set_keyframes(&inst.spec_id, t)?;
            }
        }
        Ok(())
    }
}

/// Options for the built-in headless engine.
#[derive(Clone, Debug, Default)]
pub struct HeadlessEngineOpts {
    /// Write one artifact file per rendered frame under this directory.
    pub out_dir: Option<PathBuf>,
}

/// A deterministic engine that "renders" by serializing the visible scene
/// state for a frame.
///
/// Artifacts are stable JSON snapshots: identical scene state yields
/// identical bytes, which makes the headless engine suitable for pipeline
/// tests and for exercising the validation harness without a real renderer.
/// Scalar tracks evaluate with linear interpolation, visibility with
/// step-hold.
#[derive(Debug, Default)]
pub struct HeadlessEngine {
    opts: HeadlessEngineOpts,
    materials: BTreeMap<String, MaterialDescriptor>,
    emitters: BTreeMap<String, EmitterOp>,
    tracks: BTreeMap<String, Vec<KeyframeTrack>>,
}

#[derive(serde::Serialize)]
struct FrameSnapshot<'a> {
    frame: u64,
    emitters: Vec<EmitterState<'a>>,
}

#[derive(serde::Serialize)]
struct EmitterState<'a> {
    id: &'a str,
    kind: EmitterKind,
    particle_count: u32,
    material: &'a str,
    location: Vec3,
    scale: f64,
    emission: f64,
}

impl HeadlessEngine {
    pub fn new(opts: HeadlessEngineOpts) -> Self {
        Self {
            opts,
            ..Self::default()
        }
    }

    fn track(&self, spec_id: &str, channel: Channel) -> Option<&KeyframeTrack> {
        self.tracks
            .get(spec_id)?
            .iter()
            .find(|t| t.channel == channel)
    }
}

impl SceneEngine for HeadlessEngine {
    fn create_material(&mut self, desc: &MaterialDescriptor) -> EmberResult<()> {
        self.materials.insert(desc.id.clone(), desc.clone());
        Ok(())
    }

    fn create_emitter(&mut self, op: &EmitterOp) -> EmberResult<()> {
        if !self.materials.contains_key(&op.material) {
            return Err(EmberError::render(format!(
                "emitter '{}' references unknown material '{}'",
                op.id, op.material
            )));
        }
        self.emitters.insert(op.id.clone(), op.clone());
        Ok(())
    }

    fn set_keyframes(&mut self, spec_id: &str, track: &KeyframeTrack) -> EmberResult<()> {
        self.tracks
            .entry(spec_id.to_string())
            .or_default()
            .push(track.clone());
        Ok(())
    }

    fn render_frame(&mut self, frame: FrameIndex) -> EmberResult<RenderedFrame> {
        let mut states = Vec::new();
        for op in self.emitters.values() {
            let visible = self
                .track(&op.spec_id, Channel::Visibility)
                .map(|t| t.value_step(frame))
                .unwrap_or(0.0);
            if visible < 0.5 {
                continue;
            }
            let scale = self
                .track(&op.spec_id, Channel::Scale)
                .map(|t| t.value_linear(frame))
                .unwrap_or(0.0);
            let emission = self
                .track(&op.spec_id, Channel::Emission)
                .map(|t| t.value_linear(frame))
                .unwrap_or(0.0);
            states.push(EmitterState {
                id: &op.id,
                kind: op.kind,
                particle_count: op.particle_count,
                material: &op.material,
                location: op.location,
                scale,
                emission,
            });
        }

        let snapshot = FrameSnapshot {
            frame: frame.0,
            emitters: states,
        };
        let data =
            serde_json::to_vec(&snapshot).map_err(|e| EmberError::serde(e.to_string()))?;

        let artifact_path = match &self.opts.out_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    EmberError::render(format!("create out dir '{}': {e}", dir.display()))
                })?;
                let path = dir.join(format!("frame_{:06}.json", frame.0));
                std::fs::write(&path, &data).map_err(|e| {
                    EmberError::render(format!("write artifact '{}': {e}", path.display()))
                })?;
                Some(path)
            }
            None => None,
        };

        Ok(RenderedFrame {
            artifact_path,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_batch;
    use crate::compose::compose;
    use crate::material::MaterialBank;
    use crate::model::test_fixtures::basic_batch;

    fn applied_engine() -> (HeadlessEngine, SceneMutationBatch) {
        let batch = basic_batch();
        let bank = MaterialBank::new();
        let instances = compile_batch(&batch, &bank).unwrap();
        let scene = compose(&instances, batch.frame_range(), &bank).unwrap();
        let mut engine = HeadlessEngine::new(HeadlessEngineOpts::default());
        engine.apply(&scene).unwrap();
        (engine, scene)
    }

    #[test]
    fn artifacts_are_deterministic_per_frame() {
        let (mut a, _) = applied_engine();
        let (mut b, _) = applied_engine();
        let fa = a.render_frame(FrameIndex(20)).unwrap();
        let fb = b.render_frame(FrameIndex(20)).unwrap();
        assert_eq!(fa.data, fb.data);
        assert!(!fa.data.is_empty());
    }

    #[test]
    fn dormant_frames_render_no_emitters() {
        // The fixture spec runs [10, 50).
        let (mut engine, _) = applied_engine();
        let before = engine.render_frame(FrameIndex(5)).unwrap();
        let during = engine.render_frame(FrameIndex(20)).unwrap();
        let after = engine.render_frame(FrameIndex(60)).unwrap();

        let parse = |f: &RenderedFrame| -> serde_json::Value {
            serde_json::from_slice(&f.data).unwrap()
        };
        assert_eq!(parse(&before)["emitters"].as_array().unwrap().len(), 0);
        assert_eq!(parse(&during)["emitters"].as_array().unwrap().len(), 3);
        assert_eq!(parse(&after)["emitters"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn frames_vary_through_the_rising_window() {
        let (mut engine, _) = applied_engine();
        let a = engine.render_frame(FrameIndex(12)).unwrap();
        let b = engine.render_frame(FrameIndex(14)).unwrap();
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn unknown_material_reference_is_rejected() {
        let (mut engine, scene) = applied_engine();
        let mut orphan = scene.instances[0].emitters[0].clone();
        orphan.id = "orphan/fire".to_string();
        orphan.material = "fire/teal/ultra".to_string();
        assert!(engine.create_emitter(&orphan).is_err());
    }

    #[test]
    fn out_dir_receives_one_artifact_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let batch = basic_batch();
        let bank = MaterialBank::new();
        let instances = compile_batch(&batch, &bank).unwrap();
        let scene = compose(&instances, batch.frame_range(), &bank).unwrap();

        let mut engine = HeadlessEngine::new(HeadlessEngineOpts {
            out_dir: Some(dir.path().to_path_buf()),
        });
        engine.apply(&scene).unwrap();
        let rendered = engine.render_frame(FrameIndex(20)).unwrap();
        let path = rendered.artifact_path.unwrap();
        assert!(path.ends_with("frame_000020.json"));
        assert_eq!(std::fs::read(path).unwrap(), rendered.data);
    }
}
