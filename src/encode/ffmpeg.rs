//! MP4 output through the system `ffmpeg` binary.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};

use anyhow::Context as _;
use tracing::{debug, info};

use crate::compose::pixels::{Frame, flatten_to_opaque_rgba8};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{VisemixError, VisemixResult};

const FFMPEG: &str = "ffmpeg";

#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// Color transparent pixels are flattened onto.
    pub bg_rgb: [u8; 3],
    /// libx264 constant rate factor.
    pub crf: u8,
    pub audio_bitrate: String,
}

impl FfmpegSinkOpts {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgb: [0, 0, 0],
            crf: 18,
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Validate a sink configuration for yuv420p MP4 output.
pub fn validate_config(cfg: &SinkConfig) -> VisemixResult<()> {
    if cfg.width == 0 || cfg.height == 0 {
        return Err(VisemixError::validation(
            "ffmpeg sink width/height must be non-zero",
        ));
    }
    if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
        return Err(VisemixError::validation(
            "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
        ));
    }
    if let Some(audio) = &cfg.audio
        && (audio.sample_rate == 0 || audio.channels == 0)
    {
        return Err(VisemixError::validation(
            "audio sample_rate and channels must be non-zero when audio is enabled",
        ));
    }
    Ok(())
}

/// Arguments (without the program name) for streaming raw RGBA frames on stdin.
pub fn ffmpeg_args(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    args.push(if opts.overwrite { "-y" } else { "-n" }.to_string());
    args.extend(
        [
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
        ]
        .map(String::from),
    );
    args.push(format!("{}x{}", cfg.width, cfg.height));
    // Rational input rate goes before `-i` for rawvideo.
    args.push("-r".to_string());
    args.push(format!("{}/{}", cfg.fps.num, cfg.fps.den));
    args.extend(["-i", "pipe:0"].map(String::from));

    if let Some(audio) = &cfg.audio {
        args.extend(["-f", "f32le", "-ar"].map(String::from));
        args.push(audio.sample_rate.to_string());
        args.push("-ac".to_string());
        args.push(audio.channels.to_string());
        args.push("-i".to_string());
        args.push(audio.path.display().to_string());
    } else {
        args.push("-an".to_string());
    }

    args.extend(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-crf"].map(String::from));
    args.push(opts.crf.to_string());
    if cfg.audio.is_some() {
        args.extend(["-c:a", "aac", "-b:a"].map(String::from));
        args.push(opts.audio_bitrate.clone());
        args.push("-shortest".to_string());
    }
    args.extend(["-movflags", "+faststart"].map(String::from));
    args.push(opts.out_path.display().to_string());
    args
}

/// Single-quote anything a POSIX shell would split or expand.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// The full `ffmpeg` invocation as a copy-pasteable shell line.
pub fn command_line(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> String {
    std::iter::once(FFMPEG.to_string())
        .chain(ffmpeg_args(opts, cfg).iter().map(|a| shell_quote(a)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spawns `ffmpeg` and streams flattened RGBA8 frames into its stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    frames: u64,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
            frames: 0,
        }
    }

    /// Wait for the child and collect its stderr.
    fn reap(&mut self) -> VisemixResult<(ExitStatus, Vec<u8>)> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| VisemixError::validation("ffmpeg sink not started"))?;
        let status = child.wait().context("wait for ffmpeg to finish")?;
        let stderr = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow::anyhow!("ffmpeg stderr drain thread panicked"))?
                .context("read ffmpeg stderr")?,
            None => Vec::new(),
        };
        Ok((status, stderr))
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> VisemixResult<()> {
        validate_config(&cfg)?;
        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(VisemixError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(VisemixError::external_tool(
                FFMPEG,
                "unavailable",
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let args = ffmpeg_args(&self.opts, &cfg);
        debug!(command = %command_line(&self.opts, &cfg), "spawning ffmpeg");
        let mut child = Command::new(FFMPEG)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("spawn ffmpeg (is it installed and on PATH?)")?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> VisemixResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| VisemixError::validation("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(VisemixError::ordering(format!(
                "ffmpeg sink received frame {} after frame {}",
                idx.0, last.0
            )));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(VisemixError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        flatten_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgb)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(VisemixError::validation("ffmpeg sink is already finalized"));
        };
        use std::io::Write as _;
        if let Err(e) = stdin.write_all(&self.scratch) {
            // A broken pipe means ffmpeg already exited; its stderr says why.
            let (status, stderr) = self.reap()?;
            let mut detail = stderr;
            if detail.is_empty() {
                detail = format!("write to stdin failed: {e}").into_bytes();
            }
            return Err(VisemixError::external_tool(FFMPEG, status, detail));
        }
        self.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> VisemixResult<()> {
        let (status, stderr) = self.reap()?;
        if !status.success() {
            return Err(VisemixError::external_tool(FFMPEG, status, stderr));
        }
        info!(
            out = %self.opts.out_path.display(),
            frames = self.frames,
            "ffmpeg encode finished"
        );
        self.cfg = None;
        Ok(())
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> VisemixResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new(FFMPEG)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
