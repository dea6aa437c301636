//! `overlay` and `mux`: edited frames plus re-synced audio, out to MP4 and/or
//! a PNG directory.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::audio::clip::{AudioPcm, MIX_CHANNELS, MIX_SAMPLE_RATE, write_f32le, write_wav_f32};
use crate::audio::mix::{
    MixPolicy, build_audio_manifest, frame_to_sample, load_beat_clips, mix_manifest,
};
use crate::compose::compositor::{Compositor, IconLayer, fade_alpha};
use crate::compose::pixels::Frame;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, command_line};
use crate::encode::png::PngSequenceSink;
use crate::encode::sink::{AudioInputConfig, FrameSink, MultiSink, SinkConfig};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{VisemixError, VisemixResult};
use crate::media::frames::{DEFAULT_PATTERN, DEFAULT_START_NUMBER, FrameSequence, load_image};
use crate::resync::engine::{FrameSource, ResyncPlan};
use crate::schedule::anchor::{AnchorPolicy, anchor_markers};
use crate::schedule::config::OverlayConfig;
use crate::schedule::icon::{IconGeometry, IconTrack};
use crate::schedule::ops::{EditOp, IconMove, freezes, icon_moves, schedule_edits};
use crate::script::markers::ScriptScan;
use crate::timeline::model::Timeline;

const MAX_CHUNK_BYTES: u64 = 128 * 1024 * 1024;

/// Where the rendered source frames live.
#[derive(Clone, Debug)]
pub struct FrameInput {
    pub dir: PathBuf,
    pub pattern: String,
    pub start_number: u64,
}

impl FrameInput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pattern: DEFAULT_PATTERN.to_string(),
            start_number: DEFAULT_START_NUMBER,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OverlayJob {
    pub director: PathBuf,
    /// `None` runs as a plain mux with no edits.
    pub script: Option<PathBuf>,
    pub frames: FrameInput,
    pub out: Option<PathBuf>,
    pub frames_out: Option<PathBuf>,
    pub config: OverlayConfig,
    pub mix: MixPolicy,
    pub chunk_size: usize,
    pub dry_run: bool,
}

impl OverlayJob {
    pub fn new(director: impl Into<PathBuf>, frames: FrameInput) -> Self {
        Self {
            director: director.into(),
            script: None,
            frames,
            out: None,
            frames_out: None,
            config: OverlayConfig::default(),
            mix: MixPolicy::default(),
            chunk_size: 32,
            dry_run: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayReport {
    pub source_frames: u64,
    pub output_frames: u64,
    pub freezes: usize,
    pub icon_moves: usize,
    pub audio_secs: f64,
    /// The encoder invocation, when an MP4 output was requested.
    pub command: Option<String>,
}

/// Anchor the script's markers onto the timeline. No script, no markers.
pub fn attach_markers(
    timeline: Timeline,
    scan: Option<&ScriptScan>,
    policy: AnchorPolicy,
) -> VisemixResult<Timeline> {
    let Some(scan) = scan else {
        return Ok(timeline);
    };
    let anchored = anchor_markers(scan, &timeline, policy)?;
    Ok(timeline.with_markers(anchored))
}

/// Edit ops for the timeline's anchored markers.
pub fn plan_edits(timeline: &Timeline, cfg: &OverlayConfig) -> VisemixResult<Vec<EditOp>> {
    schedule_edits(timeline.markers(), timeline.fps(), cfg)
}

/// Background, foreground width and the icon track; output size follows the background.
pub fn build_compositor(
    cfg: &OverlayConfig,
    source_canvas: Canvas,
    moves: Vec<IconMove>,
) -> VisemixResult<Compositor> {
    let background = cfg
        .background
        .as_deref()
        .map(load_image)
        .transpose()?
        .map(Arc::new);
    let frame_width = background.as_ref().map_or(source_canvas.width, |b| b.width);

    let icon = match &cfg.pf_icon {
        Some(path) => {
            let image = load_image(path)?.resized_to_width(cfg.pf_width)?;
            let geometry = IconGeometry {
                frame_width,
                width: cfg.pf_width,
                dx: cfg.pf_dx,
                margin: cfg.pf_margin,
                y: cfg.pf_y,
            };
            Some(IconLayer {
                image: Arc::new(image),
                track: IconTrack::new(geometry, moves),
                alpha: cfg.pf_alpha,
            })
        }
        None => {
            if !moves.is_empty() {
                warn!(moves = moves.len(), "icon moves scheduled but no icon image configured");
            }
            None
        }
    };
    Ok(Compositor::new(source_canvas, background, cfg.fg_width, icon))
}

/// One slate per freeze, scaled to the canvas. Images shared between freezes load once.
pub fn load_slates(plan: &ResyncPlan, canvas: Canvas) -> VisemixResult<Vec<Option<Arc<Frame>>>> {
    let mut cache: HashMap<PathBuf, Arc<Frame>> = HashMap::new();
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(f) = plan.freeze(i) {
        let slate = match &f.overlay_image {
            Some(path) => {
                if let Some(s) = cache.get(path) {
                    Some(s.clone())
                } else {
                    let s = Arc::new(load_image(path)?.resized(canvas.width, canvas.height)?);
                    cache.insert(path.clone(), s.clone());
                    Some(s)
                }
            }
            None => {
                warn!(freeze = i, "freeze has no overlay image, holding the frame without a slate");
                None
            }
        };
        out.push(slate);
        i += 1;
    }
    Ok(out)
}

/// Mix all beat clips on the source timeline, then splice silence in at each freeze.
#[tracing::instrument(skip_all)]
pub fn resync_mix(
    timeline: &Timeline,
    plan: &ResyncPlan,
    policy: MixPolicy,
) -> VisemixResult<Option<AudioPcm>> {
    let clips = load_beat_clips(timeline)?;
    if clips.is_empty() {
        return Ok(None);
    }
    let total = frame_to_sample(plan.source_frames(), plan.fps(), MIX_SAMPLE_RATE);
    let manifest = build_audio_manifest(&clips, total);
    let source_mix = mix_manifest(&manifest, policy);
    let interleaved_f32 = plan.resync_audio(&source_mix, MIX_SAMPLE_RATE, MIX_CHANNELS);
    Ok(Some(AudioPcm {
        sample_rate: MIX_SAMPLE_RATE,
        channels: MIX_CHANNELS,
        interleaved_f32,
    }))
}

/// Composite every output frame and push them to `sink` in frame order.
///
/// Frames are produced in parallel one chunk at a time; each distinct source
/// frame in a chunk is decoded once, so a freeze costs one decode per chunk.
#[tracing::instrument(skip_all, fields(frames = plan.output_frames()))]
pub fn render_to_sink(
    plan: &ResyncPlan,
    source: &FrameSequence,
    compositor: &Compositor,
    slates: &[Option<Arc<Frame>>],
    sink: &mut dyn FrameSink,
    cfg: SinkConfig,
    chunk_size: usize,
) -> VisemixResult<u64> {
    if plan.source_frames() > source.len() {
        return Err(VisemixError::validation(format!(
            "plan expects {} source frames, sequence has {}",
            plan.source_frames(),
            source.len()
        )));
    }
    let bytes_per_frame = u64::from(cfg.width)
        .saturating_mul(u64::from(cfg.height))
        .saturating_mul(4)
        .max(1);
    let chunk = (chunk_size.max(1) as u64).min((MAX_CHUNK_BYTES / bytes_per_frame).max(1));
    let fps = plan.fps();
    let total = plan.output_frames();

    sink.begin(cfg)?;
    let mut start = 0u64;
    while start < total {
        let end = (start + chunk).min(total);
        let sources: Vec<FrameSource> = (start..end)
            .map(|o| {
                plan.frame_source(o)
                    .ok_or_else(|| VisemixError::validation(format!("output frame {o} out of range")))
            })
            .collect::<VisemixResult<_>>()?;

        let needed: BTreeSet<u64> = sources.iter().map(FrameSource::source_frame).collect();
        let decoded: HashMap<u64, Frame> = needed
            .into_par_iter()
            .map(|s| source.read(s).map(|f| (s, f)))
            .collect::<VisemixResult<_>>()?;

        let frames: Vec<Frame> = sources
            .par_iter()
            .enumerate()
            .map(|(i, src)| {
                let o = start + i as u64;
                let fg = decoded.get(&src.source_frame()).ok_or_else(|| {
                    VisemixError::validation(format!("source frame {} not decoded", src.source_frame()))
                })?;
                let slate = match *src {
                    FrameSource::Copy { .. } => None,
                    FrameSource::Freeze {
                        freeze,
                        offset,
                        len,
                        ..
                    } => plan.freeze(freeze).and_then(|f| {
                        let image = slates.get(freeze)?.as_deref()?;
                        let alpha = fade_alpha(
                            offset,
                            len,
                            fps.secs_to_frames_round(f.fade_in),
                            fps.secs_to_frames_round(f.fade_out),
                            f.overlay_alpha,
                        );
                        Some((image, alpha))
                    }),
                };
                compositor.compose(fg, plan.source_time_of(o), slate)
            })
            .collect::<VisemixResult<_>>()?;

        for (o, frame) in (start..end).zip(frames.iter()) {
            sink.push_frame(FrameIndex(o), frame)?;
        }
        start = end;
    }
    sink.end()?;
    Ok(total)
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(p) = self.0.take() {
            let _ = std::fs::remove_file(p);
        }
    }
}

fn temp_audio_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "visemix_mix_{}_{}.f32le",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ))
}

/// Run the whole edit: plan, mix, composite, encode.
#[tracing::instrument(skip(job), fields(director = %job.director.display()))]
pub fn run_overlay(job: &OverlayJob) -> VisemixResult<OverlayReport> {
    if job.out.is_none() && job.frames_out.is_none() {
        return Err(VisemixError::validation(
            "nothing to write: set an output file and/or a frames output directory",
        ));
    }
    job.config.validate()?;

    let timeline = Timeline::load_for_media(&job.director)?;
    let source = FrameSequence::open(&job.frames.dir, &job.frames.pattern, job.frames.start_number)?;
    if timeline.frame_count() != source.len() {
        warn!(
            timeline_frames = timeline.frame_count(),
            sequence_frames = source.len(),
            "frame sequence length differs from the timeline"
        );
    }

    let scan = job.script.as_deref().map(ScriptScan::from_path).transpose()?;
    let timeline = attach_markers(timeline, scan.as_ref(), job.config.anchor)?;
    let ops = plan_edits(&timeline, &job.config)?;
    let freeze_ops: Vec<_> = freezes(&ops).into_iter().cloned().collect();
    let moves = icon_moves(&ops);
    let plan = ResyncPlan::new(source.len(), timeline.fps(), &freeze_ops)?;
    let compositor = build_compositor(&job.config, source.canvas(), moves.clone())?;
    let canvas = compositor.canvas();

    let mut report = OverlayReport {
        source_frames: plan.source_frames(),
        output_frames: plan.output_frames(),
        freezes: freeze_ops.len(),
        icon_moves: moves.len(),
        audio_secs: timeline.fps().frames_to_secs(plan.output_frames()),
        command: None,
    };
    let has_audio = timeline.beats().iter().any(|b| b.audio.is_some());
    let mut audio_tmp = TempFileGuard(None);
    let audio_path = temp_audio_path();
    let mut cfg = SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps: timeline.fps(),
        audio: has_audio.then(|| AudioInputConfig {
            path: audio_path.clone(),
            sample_rate: MIX_SAMPLE_RATE,
            channels: MIX_CHANNELS,
        }),
    };
    let ffmpeg_opts = job.out.as_ref().map(|out| {
        let mut o = FfmpegSinkOpts::new(out);
        o.crf = job.config.crf;
        o
    });
    report.command = ffmpeg_opts.as_ref().map(|o| command_line(o, &cfg));

    if job.dry_run {
        info!(
            output_frames = report.output_frames,
            freezes = report.freezes,
            "dry run, skipping render and encode"
        );
        return Ok(report);
    }

    match resync_mix(&timeline, &plan, job.mix)? {
        Some(pcm) => {
            write_f32le(&audio_path, &pcm.interleaved_f32)?;
            audio_tmp.0 = Some(audio_path.clone());
            if let Some(dir) = &job.frames_out {
                write_wav_f32(&dir.join("audio.wav"), &pcm)?;
            }
            report.audio_secs = pcm.duration_secs();
        }
        None => cfg.audio = None,
    }

    let slates = load_slates(&plan, canvas)?;
    let mut sinks: Vec<Box<dyn FrameSink>> = Vec::new();
    if let Some(opts) = ffmpeg_opts {
        sinks.push(Box::new(FfmpegSink::new(opts)));
    }
    if let Some(dir) = &job.frames_out {
        sinks.push(Box::new(PngSequenceSink::new(
            dir,
            DEFAULT_PATTERN,
            DEFAULT_START_NUMBER,
        )?));
    }
    let mut sink = MultiSink::new(sinks);
    render_to_sink(&plan, &source, &compositor, &slates, &mut sink, cfg, job.chunk_size)?;

    info!(
        source_frames = report.source_frames,
        output_frames = report.output_frames,
        freezes = report.freezes,
        icon_moves = report.icon_moves,
        "overlay finished"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/overlay.rs"]
mod tests;
