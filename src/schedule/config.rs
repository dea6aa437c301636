//! Overlay/icon settings file and per-overlay lookup.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{VisemixError, VisemixResult};
use crate::schedule::anchor::AnchorPolicy;

/// Key of an `overlays` entry: a numeric overlay id or the literal `"default"`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum OverlayKey {
    Id(u32),
    Name(String),
}

impl OverlayKey {
    fn is_default(&self) -> bool {
        matches!(self, Self::Name(n) if n.eq_ignore_ascii_case("default"))
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayEntry {
    pub id: Option<OverlayKey>,
    pub image: Option<PathBuf>,
    pub duration: Option<f64>,
    pub fade: Option<f64>,
    pub overlay_alpha: Option<f64>,
    pub pre_roll_sec: Option<f64>,
    pub pre_roll_frames: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Full-screen slate image used when nothing more specific resolves.
    pub overlay_image: Option<PathBuf>,
    pub duration: f64,
    pub fade: f64,
    pub overlay_alpha: f64,
    pub anchor: AnchorPolicy,
    pub pre_roll_frames: u32,
    /// Overrides `pre_roll_frames` when > 0.
    pub pre_roll_sec: f64,
    pub pf_icon: Option<PathBuf>,
    pub pf_width: u32,
    pub pf_dx: u32,
    pub pf_margin: u32,
    pub pf_y: u32,
    pub pf_anim_sec: f64,
    /// Icon opacity.
    pub pf_alpha: f64,
    pub background: Option<PathBuf>,
    pub fg_width: u32,
    pub crf: u8,
    pub overlays: Vec<OverlayEntry>,
    /// Extra directories searched for `Overlay{n}.png`.
    #[serde(skip)]
    pub search_dirs: Vec<PathBuf>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            overlay_image: None,
            duration: 12.0,
            fade: 0.5,
            overlay_alpha: 0.9,
            anchor: AnchorPolicy::PrevEnd,
            pre_roll_frames: 2,
            pre_roll_sec: 0.0,
            pf_icon: None,
            pf_width: 200,
            pf_dx: 300,
            pf_margin: 60,
            pf_y: 60,
            pf_anim_sec: 0.5,
            pf_alpha: 1.0,
            background: None,
            fg_width: 1400,
            crf: 18,
            overlays: Vec::new(),
            search_dirs: Vec::new(),
        }
    }
}

/// Settings for one overlay after per-id and default entries are applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedOverlay {
    pub duration: f64,
    pub fade: f64,
    pub overlay_alpha: f64,
    pub pre_roll_sec: f64,
    pub image: Option<PathBuf>,
}

impl OverlayConfig {
    pub fn from_json_str(s: &str) -> VisemixResult<Self> {
        serde_json::from_str(s).map_err(|e| VisemixError::serde(format!("overlay config: {e}")))
    }

    /// Load a config file; relative paths inside it resolve against its directory,
    /// which also joins the `Overlay{n}.png` search.
    pub fn from_path(path: &Path) -> VisemixResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read overlay config '{}'", path.display()))?;
        let mut cfg = Self::from_json_str(&text)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        cfg.resolve_relative_to(dir);
        cfg.push_search_root(dir);
        Ok(cfg)
    }

    fn resolve_relative_to(&mut self, dir: &Path) {
        let fix = |p: &mut Option<PathBuf>| {
            if let Some(v) = p
                && v.is_relative()
            {
                *v = dir.join(&*v);
            }
        };
        fix(&mut self.overlay_image);
        fix(&mut self.pf_icon);
        fix(&mut self.background);
        for o in &mut self.overlays {
            fix(&mut o.image);
        }
    }

    /// Add `dir`, `dir/assets` and `dir/scenes` to the discovery search.
    pub fn push_search_root(&mut self, dir: &Path) {
        for d in [dir.to_path_buf(), dir.join("assets"), dir.join("scenes")] {
            if !self.search_dirs.contains(&d) {
                self.search_dirs.push(d);
            }
        }
    }

    pub fn validate(&self) -> VisemixResult<()> {
        if self.duration.is_nan() || self.duration <= 0.0 {
            return Err(VisemixError::timing(format!(
                "overlay duration must be > 0, got {}",
                self.duration
            )));
        }
        if self.fade < 0.0 || self.pf_anim_sec < 0.0 {
            return Err(VisemixError::validation("fade and pf_anim_sec must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.overlay_alpha) {
            return Err(VisemixError::validation(format!(
                "overlay_alpha must be within [0, 1], got {}",
                self.overlay_alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.pf_alpha) {
            return Err(VisemixError::validation(format!(
                "pf_alpha must be within [0, 1], got {}",
                self.pf_alpha
            )));
        }
        if self.pf_width == 0 || self.fg_width == 0 {
            return Err(VisemixError::validation("pf_width and fg_width must be > 0"));
        }
        Ok(())
    }

    fn entry(&self, id: Option<u32>) -> Option<&OverlayEntry> {
        let id = id?;
        self.overlays
            .iter()
            .find(|o| o.id == Some(OverlayKey::Id(id)))
    }

    fn default_entry(&self) -> Option<&OverlayEntry> {
        self.overlays
            .iter()
            .find(|o| o.id.as_ref().is_some_and(OverlayKey::is_default))
    }

    /// Per-id entry, then the `default` entry, then the global values.
    pub fn resolve(&self, id: Option<u32>, fps: f64) -> ResolvedOverlay {
        let by_id = self.entry(id);
        let dflt = self.default_entry();
        let pick = |f: fn(&OverlayEntry) -> Option<f64>, global: f64| {
            by_id.and_then(f).or_else(|| dflt.and_then(f)).unwrap_or(global)
        };

        let duration = pick(|o| o.duration, self.duration);
        let fade = pick(|o| o.fade, self.fade);
        let overlay_alpha = pick(|o| o.overlay_alpha, self.overlay_alpha).clamp(0.0, 1.0);
        let pre_roll_sec_cfg = pick(|o| o.pre_roll_sec, self.pre_roll_sec);
        let pre_roll_frames = by_id
            .and_then(|o| o.pre_roll_frames)
            .or_else(|| dflt.and_then(|o| o.pre_roll_frames))
            .unwrap_or(self.pre_roll_frames);
        let pre_roll_sec = if pre_roll_sec_cfg > 0.0 {
            pre_roll_sec_cfg
        } else {
            f64::from(pre_roll_frames) / fps
        };

        ResolvedOverlay {
            duration,
            fade,
            overlay_alpha,
            pre_roll_sec,
            image: self.resolve_image(id, by_id, dflt),
        }
    }

    /// Per-id image, default image, discovered `Overlay{n}.png`, then the global image.
    fn resolve_image(
        &self,
        id: Option<u32>,
        by_id: Option<&OverlayEntry>,
        dflt: Option<&OverlayEntry>,
    ) -> Option<PathBuf> {
        let existing = |e: Option<&OverlayEntry>| {
            e.and_then(|o| o.image.clone()).filter(|p| p.is_file())
        };
        if let Some(p) = existing(by_id) {
            return Some(p);
        }
        if let Some(p) = existing(dflt) {
            return Some(p);
        }
        if let Some(n) = id {
            let name = format!("Overlay{n}.png");
            let global_dir = self.overlay_image.as_deref().and_then(Path::parent);
            let found = global_dir
                .into_iter()
                .chain(self.search_dirs.iter().map(PathBuf::as_path))
                .map(|d| d.join(&name))
                .find(|p| p.is_file());
            if found.is_some() {
                return found;
            }
        }
        self.overlay_image.clone()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/config.rs"]
mod tests;
