use emberfx::{
    BaselineSet, BatchBuilder, ColorBias, EffectBatch, Fps, HeadlessEngine, HeadlessEngineOpts,
    MaterialBank, QualityTier, RenderSettings, Resolution, RunnerOpts, SampleRun, SpecBuilder,
    Thresholds, Vec3,
};

fn settings() -> RenderSettings {
    RenderSettings {
        quality_default: QualityTier::Medium,
        resolution: Resolution {
            width: 1280,
            height: 720,
        },
        fps: Fps { num: 24, den: 1 },
        engine: "headless".to_string(),
        duration_frames: 200,
    }
}

fn two_spec_batch() -> EffectBatch {
    BatchBuilder::new(settings())
        .seed(11)
        .spec(
            SpecBuilder::new("boom_main", 10, 40)
                .location(Vec3::new(0.0, 0.0, 2.0))
                .intensity(1.2)
                .color_bias(ColorBias::Orange)
                .build()
                .unwrap(),
        )
        .unwrap()
        .spec(
            SpecBuilder::new("boom_side", 10, 40)
                .location(Vec3::new(6.0, 0.0, 1.0))
                .intensity(0.8)
                .color_bias(ColorBias::Blue)
                .build()
                .unwrap(),
        )
        .unwrap()
        .build()
        .unwrap()
}

fn run_pipeline(batch: &EffectBatch) -> SampleRun {
    let materials = MaterialBank::new();
    let instances = emberfx::compile_batch(batch, &materials).unwrap();
    let scene = emberfx::compose(&instances, batch.frame_range(), &materials).unwrap();
    let frames = emberfx::select_sample_frames(&scene);
    let mut engine = HeadlessEngine::new(HeadlessEngineOpts::default());
    emberfx::sample(&mut engine, &scene, &frames, RunnerOpts::default()).unwrap()
}

#[test]
fn capture_then_revalidate_passes() {
    let batch = two_spec_batch();

    let first = run_pipeline(&batch);
    assert_eq!(first.stats.frames_failed, 0);
    let baseline = BaselineSet::capture(&first.metrics);
    assert_eq!(baseline.frames.len(), first.metrics.len());

    // A fresh run of the same batch must reproduce the baseline exactly.
    let second = run_pipeline(&batch);
    let verdict = emberfx::validate(&second.metrics, &baseline, &Thresholds::default());
    assert!(verdict.pass, "report:\n{}", verdict.report());
    assert_eq!(verdict.pass_rate, 1.0);
    assert!(verdict.failures.is_empty());
}

#[test]
fn removed_instance_fails_against_the_old_baseline() {
    let full = two_spec_batch();
    let baseline = BaselineSet::capture(&run_pipeline(&full).metrics);

    // Same scene without the second explosion: every shared sample frame
    // loses half its emitters.
    let mut reduced = full.clone();
    reduced.specs.truncate(1);
    let run = run_pipeline(&reduced);

    let verdict = emberfx::validate(&run.metrics, &baseline, &Thresholds::default());
    assert!(!verdict.pass);
    assert!(!verdict.failures.is_empty());
}

#[test]
fn baseline_roundtrips_through_disk() {
    let batch = two_spec_batch();
    let run = run_pipeline(&batch);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("baseline.json");
    BaselineSet::capture(&run.metrics).save(&path).unwrap();
    let loaded = BaselineSet::from_path(&path).unwrap();

    let verdict = emberfx::validate(&run.metrics, &loaded, &Thresholds::default());
    assert!(verdict.pass);
}
