use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use visemix::{
    AnchorPolicy, FrameInput, MixPolicy, OverlayConfig, OverlayJob, RenderOverrides,
    TimingOverrides,
};

#[derive(Parser, Debug)]
#[command(name = "visemix", version, about = "Viseme timelines and overlay editing")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the director and character map and report what they describe.
    Validate(ValidateArgs),
    /// Write per-frame poses for every character as JSON.
    Poses(PosesArgs),
    /// Insert slates and icon moves at script markers, re-sync audio, encode.
    Overlay(OverlayArgs),
    /// Composite, mix and encode with no edits.
    Mux(MuxArgs),
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Director document JSON.
    #[arg(long)]
    director: PathBuf,
    /// Character map JSON.
    #[arg(long)]
    characters: PathBuf,
}

#[derive(Args, Debug)]
struct PosesArgs {
    #[arg(long)]
    director: PathBuf,
    #[arg(long)]
    characters: PathBuf,
    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,
    /// Frames the mouth leads the audio by.
    #[arg(long, allow_negative_numbers = true)]
    lead_frames: Option<i64>,
    /// Show transcript content this many seconds later (negative: earlier).
    #[arg(long, allow_negative_numbers = true)]
    time_offset_sec: Option<f64>,
    /// 0 = instant, 1 = frozen.
    #[arg(long)]
    smooth_factor: Option<f64>,
    /// Disable procedural blinks.
    #[arg(long, default_value_t = false)]
    no_blink: bool,
    /// Render engine name passed through to the renderer.
    #[arg(long)]
    engine: Option<String>,
    /// Render resolution as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_resolution)]
    resolution: Option<[u32; 2]>,
    /// Render quality preset passed through to the renderer.
    #[arg(long)]
    quality: Option<String>,
}

#[derive(Args, Debug)]
struct FramesArgs {
    /// Directory of rendered frames.
    #[arg(long)]
    frames: PathBuf,
    /// printf-style frame file name.
    #[arg(long, default_value = visemix::media::frames::DEFAULT_PATTERN)]
    pattern: String,
    /// Number of the first frame file.
    #[arg(long, default_value_t = visemix::media::frames::DEFAULT_START_NUMBER)]
    start_number: u64,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output MP4 path (requires `ffmpeg` on PATH unless --dry-run).
    #[arg(long, required_unless_present = "frames_out")]
    out: Option<PathBuf>,
    /// Also (or instead) write edited PNG frames and `audio.wav` here.
    #[arg(long)]
    frames_out: Option<PathBuf>,
    /// Full-screen background; the frames are scaled onto it.
    #[arg(long)]
    background: Option<PathBuf>,
    /// Foreground width on the background.
    #[arg(long)]
    fg_width: Option<u32>,
    /// libx264 CRF.
    #[arg(long)]
    crf: Option<u8>,
    #[arg(long, value_enum, default_value_t = MixPolicy::Sum)]
    mix: MixPolicy,
    /// Frames composited per parallel batch.
    #[arg(long, default_value_t = 32)]
    chunk_size: usize,
    /// Print the encoder command and stop.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct OverlayArgs {
    #[arg(long)]
    director: PathBuf,
    /// Script text carrying the markers.
    #[arg(long)]
    script: PathBuf,
    #[command(flatten)]
    frames: FramesArgs,
    #[command(flatten)]
    output: OutputArgs,
    /// Overlay settings JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    overlay_image: Option<PathBuf>,
    /// Seconds each slate holds.
    #[arg(long)]
    duration: Option<f64>,
    #[arg(long)]
    fade: Option<f64>,
    #[arg(long)]
    overlay_alpha: Option<f64>,
    #[arg(long, value_enum)]
    anchor: Option<AnchorPolicy>,
    #[arg(long)]
    pre_roll_frames: Option<u32>,
    #[arg(long)]
    pf_icon: Option<PathBuf>,
    #[arg(long)]
    pf_width: Option<u32>,
    #[arg(long)]
    pf_dx: Option<u32>,
    #[arg(long)]
    pf_margin: Option<u32>,
    #[arg(long)]
    pf_y: Option<u32>,
    #[arg(long)]
    pf_anim_sec: Option<f64>,
    /// Icon opacity in [0, 1].
    #[arg(long)]
    pf_alpha: Option<f64>,
}

#[derive(Args, Debug)]
struct MuxArgs {
    #[arg(long)]
    director: PathBuf,
    #[command(flatten)]
    frames: FramesArgs,
    #[command(flatten)]
    output: OutputArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("visemix=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Poses(args) => cmd_poses(args),
        Command::Overlay(args) => cmd_overlay(args),
        Command::Mux(args) => cmd_mux(args),
    }
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let r = visemix::validate(&args.director, &args.characters)?;
    println!(
        "ok: {} speech beats, {} pauses, {} speakers, {:.3}s at {} fps = {} frames",
        r.speech_beats,
        r.pause_beats,
        r.speakers.len(),
        r.duration,
        r.fps,
        r.frame_count
    );
    Ok(())
}

fn cmd_poses(args: PosesArgs) -> anyhow::Result<()> {
    let timing = TimingOverrides {
        lead_frames: args.lead_frames,
        time_offset_sec: args.time_offset_sec,
        smooth_factor: args.smooth_factor,
        no_blink: args.no_blink,
    };
    let render = RenderOverrides {
        resolution: args.resolution,
        engine: args.engine,
        quality: args.quality,
    };
    let export =
        visemix::export_poses(&args.director, &args.characters, &timing, &render, &args.out)?;
    eprintln!(
        "wrote {} ({} characters, {} frames)",
        args.out.display(),
        export.characters.len(),
        export.frame_count
    );
    Ok(())
}

fn cmd_overlay(args: OverlayArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => OverlayConfig::from_path(path)?,
        None => OverlayConfig::default(),
    };
    config.push_search_root(parent_dir(&args.script));
    set(&mut config.overlay_image, args.overlay_image.map(Some));
    set(&mut config.duration, args.duration);
    set(&mut config.fade, args.fade);
    set(&mut config.overlay_alpha, args.overlay_alpha);
    set(&mut config.anchor, args.anchor);
    set(&mut config.pre_roll_frames, args.pre_roll_frames);
    set(&mut config.pf_icon, args.pf_icon.map(Some));
    set(&mut config.pf_width, args.pf_width);
    set(&mut config.pf_dx, args.pf_dx);
    set(&mut config.pf_margin, args.pf_margin);
    set(&mut config.pf_y, args.pf_y);
    set(&mut config.pf_anim_sec, args.pf_anim_sec);
    set(&mut config.pf_alpha, args.pf_alpha);

    let job = build_job(args.director, Some(args.script), args.frames, args.output, config);
    run(&job)
}

fn cmd_mux(args: MuxArgs) -> anyhow::Result<()> {
    let job = build_job(
        args.director,
        None,
        args.frames,
        args.output,
        OverlayConfig::default(),
    );
    run(&job)
}

fn build_job(
    director: PathBuf,
    script: Option<PathBuf>,
    frames: FramesArgs,
    output: OutputArgs,
    mut config: OverlayConfig,
) -> OverlayJob {
    set(&mut config.background, output.background.map(Some));
    set(&mut config.fg_width, output.fg_width);
    set(&mut config.crf, output.crf);

    let mut job = OverlayJob::new(
        director,
        FrameInput {
            dir: frames.frames,
            pattern: frames.pattern,
            start_number: frames.start_number,
        },
    );
    job.script = script;
    job.out = output.out;
    job.frames_out = output.frames_out;
    job.config = config;
    job.mix = output.mix;
    job.chunk_size = output.chunk_size;
    job.dry_run = output.dry_run;
    job
}

fn run(job: &OverlayJob) -> anyhow::Result<()> {
    let report = visemix::run_overlay(job)?;
    if job.dry_run {
        if let Some(cmd) = &report.command {
            println!("{cmd}");
        }
        return Ok(());
    }
    eprintln!(
        "{} -> {} frames ({} freezes, {} icon moves, {:.3}s audio)",
        report.source_frames,
        report.output_frames,
        report.freezes,
        report.icon_moves,
        report.audio_secs
    );
    Ok(())
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn parse_resolution(s: &str) -> Result<[u32; 2], String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid resolution '{s}': {e}"))
    };
    Ok([parse(w)?, parse(h)?])
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}
