use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use emberfx::{
    BaselineSet, EffectBatch, FrameIndex, HeadlessEngine, HeadlessEngineOpts, MaterialBank,
    QualityTier, RunnerOpts, SceneMutationBatch, Thresholds,
};

#[derive(Parser, Debug)]
#[command(name = "emberfx", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a batch document and print a scene summary.
    Compile(CompileArgs),
    /// Render sample frames with the built-in headless engine.
    Render(RenderArgs),
    /// Render samples and gate them against an approved baseline.
    Validate(ValidateArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TierArg {
    Quick,
    Medium,
    High,
}

impl From<TierArg> for QualityTier {
    fn from(v: TierArg) -> Self {
        match v {
            TierArg::Quick => Self::Quick,
            TierArg::Medium => Self::Medium,
            TierArg::High => Self::High,
        }
    }
}

#[derive(Parser, Debug)]
struct CompileArgs {
    /// Input batch JSON.
    #[arg(long)]
    spec: PathBuf,

    /// Override the batch's default quality tier.
    #[arg(long)]
    quality: Option<TierArg>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input batch JSON.
    #[arg(long)]
    spec: PathBuf,

    /// Comma-separated frame list; defaults to representative selection.
    #[arg(long)]
    frames: Option<String>,

    /// Write one artifact file per rendered frame under this directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Write metrics JSON here instead of stdout.
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Per-frame render timeout in seconds.
    #[arg(long)]
    timeout: Option<f64>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input batch JSON.
    #[arg(long)]
    spec: PathBuf,

    /// Baseline JSON document (read, or written with --capture-reference).
    #[arg(long)]
    baseline: PathBuf,

    /// Minimum pass rate.
    #[arg(long, default_value_t = 0.8)]
    threshold: f64,

    /// Per-frame and average render-time budget in seconds.
    #[arg(long, default_value_t = 30.0)]
    max_seconds: f64,

    /// Write the current samples as the new baseline instead of gating.
    #[arg(long, default_value_t = false)]
    capture_reference: bool,

    /// Write one artifact file per rendered frame under this directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Per-frame render timeout in seconds.
    #[arg(long)]
    timeout: Option<f64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Compile(args) => cmd_compile(args),
        Command::Render(args) => cmd_render(args),
        Command::Validate(args) => cmd_validate(args),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn load_scene(
    spec_path: &PathBuf,
    quality: Option<TierArg>,
) -> anyhow::Result<(EffectBatch, MaterialBank, SceneMutationBatch)> {
    let mut batch = EffectBatch::from_path(spec_path)
        .with_context(|| format!("load batch '{}'", spec_path.display()))?;
    if let Some(tier) = quality {
        batch.settings.quality_default = tier.into();
    }

    let materials = MaterialBank::new();
    let instances = emberfx::compile_batch(&batch, &materials)?;
    let scene = emberfx::compose(&instances, batch.frame_range(), &materials)?;
    Ok((batch, materials, scene))
}

fn cmd_compile(args: CompileArgs) -> anyhow::Result<ExitCode> {
    let (batch, materials, scene) = load_scene(&args.spec, args.quality)?;
    let sample_frames: Vec<u64> = emberfx::select_sample_frames(&scene)
        .iter()
        .map(|f| f.0)
        .collect();

    let summary = serde_json::json!({
        "specs": batch.specs.len(),
        "instances": scene.instances.len(),
        "materials": materials.len(),
        "scene_frames": batch.settings.duration_frames,
        "sample_frames": sample_frames,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<ExitCode> {
    let (_, _, scene) = load_scene(&args.spec, None)?;
    let frames = match args.frames.as_deref() {
        Some(list) => parse_frames(list)?,
        None => emberfx::select_sample_frames(&scene),
    };

    let mut engine = HeadlessEngine::new(HeadlessEngineOpts {
        out_dir: args.out_dir,
    });
    let run = emberfx::sample(
        &mut engine,
        &scene,
        &frames,
        RunnerOpts {
            timeout_seconds: args.timeout,
        },
    )?;

    if run.stats.frames_failed > 0 {
        eprintln!(
            "{} of {} frames failed",
            run.stats.frames_failed, run.stats.frames_total
        );
    }

    let text = serde_json::to_string_pretty(&run.metrics)?;
    match args.metrics {
        Some(path) => std::fs::write(&path, text)
            .with_context(|| format!("write metrics '{}'", path.display()))?,
        None => println!("{text}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<ExitCode> {
    let (_, _, scene) = load_scene(&args.spec, None)?;
    let frames = emberfx::select_sample_frames(&scene);

    let mut engine = HeadlessEngine::new(HeadlessEngineOpts {
        out_dir: args.out_dir,
    });
    let run = emberfx::sample(
        &mut engine,
        &scene,
        &frames,
        RunnerOpts {
            timeout_seconds: args.timeout,
        },
    )?;

    if args.capture_reference {
        let baseline = BaselineSet::capture(&run.metrics);
        baseline
            .save(&args.baseline)
            .with_context(|| format!("write baseline '{}'", args.baseline.display()))?;
        eprintln!(
            "captured {} reference frames to {}",
            baseline.frames.len(),
            args.baseline.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let baseline = BaselineSet::from_path(&args.baseline)
        .with_context(|| format!("load baseline '{}'", args.baseline.display()))?;
    let thresholds = Thresholds {
        min_pass_rate: args.threshold,
        max_seconds_per_frame: args.max_seconds,
        ..Thresholds::default()
    };
    let verdict = emberfx::validate(&run.metrics, &baseline, &thresholds);

    eprint!("{}", verdict.report());
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(if verdict.pass {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn parse_frames(list: &str) -> anyhow::Result<Vec<FrameIndex>> {
    let mut frames = Vec::new();
    for part in list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let n: u64 = part
            .parse()
            .with_context(|| format!("invalid frame number '{part}'"))?;
        frames.push(FrameIndex(n));
    }
    if frames.is_empty() {
        anyhow::bail!("frame list is empty");
    }
    frames.sort_unstable();
    frames.dedup();
    Ok(frames)
}
