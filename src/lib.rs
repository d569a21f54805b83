//! emberfx compiles declarative explosion-effect batches into time-boxed,
//! animated instances in a shared 3D scene, then samples and validates the
//! rendered result against an approved baseline and a performance budget.
//!
//! The pipeline is explicitly staged:
//!
//! 1. Load and schema-validate an [`EffectBatch`]
//! 2. Compile specs into instances: [`compile_batch`]
//! 3. Compose instances into one [`SceneMutationBatch`]: [`compose`]
//! 4. Sample representative frames through a [`SceneEngine`]: [`sample`]
//! 5. Gate the metrics: [`validate`]
#![forbid(unsafe_code)]

pub mod baseline;
pub mod compile;
pub mod compose;
pub mod core;
pub mod dsl;
pub mod ease;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod material;
pub mod model;
pub mod quality;
pub mod render_job;
pub(crate) mod schema;
pub mod validate;

pub use crate::baseline::{BaselineSet, ReferenceFrame};
pub use crate::compile::{EffectInstance, MaterialRefs, ParticleCounts, compile, compile_batch};
pub use crate::compose::{MAX_SIMULTANEOUS, SceneMutationBatch, compose};
pub use crate::core::{FrameIndex, FrameRange, Fps, Resolution, Vec3};
pub use crate::dsl::{BatchBuilder, SpecBuilder};
pub use crate::ease::Ease;
pub use crate::engine::{HeadlessEngine, HeadlessEngineOpts, RenderedFrame, SceneEngine};
pub use crate::error::{EmberError, EmberResult};
pub use crate::lifecycle::{Phase, PhaseSample, PhaseSchedule};
pub use crate::material::{MaterialBank, MaterialDescriptor, MaterialKey, MaterialKind};
pub use crate::model::{ColorBias, EffectBatch, EffectSpec, QualityTier, RenderSettings};
pub use crate::quality::{QualityProfile, resolve};
pub use crate::render_job::{
    RenderMetric, RunnerOpts, SampleRun, SampleStats, sample, select_sample_frames,
};
pub use crate::validate::{FailureReason, FrameFailure, Thresholds, ValidationVerdict, validate};
