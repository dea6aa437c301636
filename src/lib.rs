#![forbid(unsafe_code)]
//! Frame-accurate lip-sync timelines and slate/icon overlay editing.
//!
//! The crate turns a director document (beats with word/phoneme timing) into
//! per-frame viseme poses for an external renderer, then edits the rendered
//! frames: script markers become freeze-frame slates and icon moves, and the
//! audio is re-synced so every beat keeps its original offset to its picture.
//!
//! Stages, in the order a run uses them:
//! - [`timeline`]: director and character-map documents, validated at load.
//! - [`viseme`] and [`pose`]: viseme curves and `pose(frame, character)` queries.
//! - [`script`] and [`schedule`]: marker scan, anchoring and edit ops.
//! - [`resync`], [`audio`], [`compose`]: output layout, mix and per-frame layers.
//! - [`media`], [`encode`], [`pipeline`]: frame IO, sinks and the end-to-end runs.

pub mod audio;
pub mod compose;
pub mod encode;
pub mod foundation;
pub mod media;
pub mod pipeline;
pub mod pose;
pub mod resync;
pub mod schedule;
pub mod script;
pub mod timeline;
pub mod viseme;

pub use audio::clip::{AudioPcm, MIX_CHANNELS, MIX_SAMPLE_RATE};
pub use audio::mix::MixPolicy;
pub use compose::compositor::{Compositor, IconLayer, Placement, fade_alpha, place_foreground};
pub use compose::pixels::Frame;
pub use encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use encode::png::PngSequenceSink;
pub use encode::sink::{AudioInputConfig, FrameSink, InMemorySink, MultiSink, SinkConfig};
pub use foundation::core::{Canvas, Fps, FrameIndex};
pub use foundation::error::{VisemixError, VisemixResult};
pub use media::frames::FrameSequence;
pub use pipeline::overlay::{FrameInput, OverlayJob, OverlayReport, run_overlay};
pub use pipeline::poses::{RenderOverrides, TimingOverrides, ValidateReport, export_poses, validate};
pub use pose::export::PoseExport;
pub use pose::synth::{Pose, PoseSynthesizer};
pub use resync::engine::ResyncPlan;
pub use schedule::anchor::{AnchorPolicy, AnchoredMarker, anchor_markers};
pub use schedule::config::OverlayConfig;
pub use schedule::ops::{EditOp, FreezeInsert, IconMove, schedule_edits};
pub use script::markers::{Marker, MarkerKind, ScriptScan};
pub use timeline::characters::{CharacterMap, CharacterTarget};
pub use timeline::model::{Beat, BeatKind, Timeline};
pub use viseme::table::VisemeTable;
