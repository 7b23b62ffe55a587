use anyhow::{Context, Result};
use knuffel::Decode;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::filter::FrequencyBand;

#[derive(Decode, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    #[knuffel(argument)]
    pub first: f64,
    #[knuffel(argument)]
    pub second: f64,
}

impl Window {
    pub const fn new(first: f64, second: f64) -> Self {
        Self { first, second }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickerConfig {
    pub pick_win: Window,
    pub trig_thres: f64,
    pub pick_thres: f64,
    pub p_win: Window,
    pub s_win: Window,
    pub pca_win: f64,
    pub pca_range: Window,
    pub fd_thres: f64,
    pub amp_win: Window,
    pub det_gap: f64,
    pub to_prep: bool,
    pub freq_band: FrequencyBand,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            pick_win: Window::new(10.0, 1.0),
            trig_thres: 15.0,
            pick_thres: 0.96,
            p_win: Window::new(1.0, 1.0),
            s_win: Window::new(0.0, 20.0),
            pca_win: 1.0,
            pca_range: Window::new(0.0, 2.5),
            fd_thres: 2.5,
            amp_win: Window::new(1.0, 5.0),
            det_gap: 5.0,
            to_prep: true,
            freq_band: FrequencyBand::Highpass { freq: 1.0 },
        }
    }
}

#[derive(Decode, Debug, Clone, Default)]
pub struct PalConfig {
    #[knuffel(child)]
    pub general: Option<GeneralConfig>,
    #[knuffel(child)]
    pub picker: Option<PickerNode>,
}

#[derive(Decode, Debug, Clone, Default)]
pub struct GeneralConfig {
    #[knuffel(property)]
    pub threads: Option<i32>,
}

#[derive(Decode, Debug, Clone, Default)]
pub struct PickerNode {
    #[knuffel(child)]
    pub pick_win: Option<Window>,
    #[knuffel(child, unwrap(argument))]
    pub trig_thres: Option<f64>,
    #[knuffel(child, unwrap(argument))]
    pub pick_thres: Option<f64>,
    #[knuffel(child)]
    pub p_win: Option<Window>,
    #[knuffel(child)]
    pub s_win: Option<Window>,
    #[knuffel(child, unwrap(argument))]
    pub pca_win: Option<f64>,
    #[knuffel(child)]
    pub pca_range: Option<Window>,
    #[knuffel(child, unwrap(argument))]
    pub fd_thres: Option<f64>,
    #[knuffel(child)]
    pub amp_win: Option<Window>,
    #[knuffel(child, unwrap(argument))]
    pub det_gap: Option<f64>,
    #[knuffel(child, unwrap(argument))]
    pub to_prep: Option<bool>,
    #[knuffel(child)]
    pub freq_band: Option<BandNode>,
}

#[derive(Decode, Debug, Clone)]
pub struct BandNode {
    #[knuffel(argument)]
    pub kind: String,
    #[knuffel(arguments)]
    pub corners: Vec<f64>,
}

impl PalConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&path.display().to_string(), &content)
    }

    pub fn parse(name: &str, content: &str) -> Result<Self> {
        let config = knuffel::parse::<PalConfig>(name, content)?;
        Ok(config)
    }

    /// Explicit path, else `config.kdl` in the platform config directory,
    /// else built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Using config {}", path.display());
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn threads(&self) -> usize {
        match self.general.as_ref().and_then(|g| g.threads) {
            Some(n) if n > 0 => n as usize,
            _ => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        }
    }

    pub fn picker_config(&self) -> Result<PickerConfig> {
        let mut cfg = PickerConfig::default();
        let Some(node) = self.picker.as_ref() else { return Ok(cfg) };
        if let Some(w) = node.pick_win { cfg.pick_win = w; }
        if let Some(v) = node.trig_thres { cfg.trig_thres = v; }
        if let Some(v) = node.pick_thres { cfg.pick_thres = v; }
        if let Some(w) = node.p_win { cfg.p_win = w; }
        if let Some(w) = node.s_win { cfg.s_win = w; }
        if let Some(v) = node.pca_win { cfg.pca_win = v; }
        if let Some(w) = node.pca_range { cfg.pca_range = w; }
        if let Some(v) = node.fd_thres { cfg.fd_thres = v; }
        if let Some(w) = node.amp_win { cfg.amp_win = w; }
        if let Some(v) = node.det_gap { cfg.det_gap = v; }
        if let Some(v) = node.to_prep { cfg.to_prep = v; }
        if let Some(band) = node.freq_band.as_ref() {
            cfg.freq_band = FrequencyBand::from_parts(&band.kind, &band.corners)?;
        }
        Ok(cfg)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "pal", "palpick").map(|dirs| dirs.config_dir().join("config.kdl"))
}
