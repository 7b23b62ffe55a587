//! STA/LTA trigger with PCA-filtered S picking.

pub mod cf;
pub mod measure;
pub mod polarization;
pub mod ppick;
pub mod scan;
pub mod spick;
pub mod trigger;

use anyhow::{Context, Result};
use log::{info, warn};
use std::io::Write;
use std::sync::Arc;
use crate::config::PickerConfig;
use crate::filter::{BiquadPreprocessor, Preprocess};
use crate::pick::{Pick, PickSet};
use crate::util::{add_secs, secs_to_npts};
use crate::waveform::Waveform;
use self::cf::StaLtaWindow;
use self::measure::origin_offset;
use self::scan::{Detection, Scan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindows {
    pub pick_win: StaLtaWindow,
    pub p_win: [usize; 2],
    pub s_win: [usize; 2],
    pub pca_win: usize,
    pub pca_range: [usize; 2],
    pub amp_win: [usize; 2],
    pub det_gap: usize,
}

impl SampleWindows {
    pub fn new(cfg: &PickerConfig, sample_rate: f64) -> Self {
        let npts = |secs: f64| secs_to_npts(sample_rate, secs);
        Self {
            pick_win: StaLtaWindow { lwin: npts(cfg.pick_win.first), swin: npts(cfg.pick_win.second) },
            p_win: [npts(cfg.p_win.first), npts(cfg.p_win.second)],
            s_win: [npts(cfg.s_win.first), npts(cfg.s_win.second)],
            pca_win: npts(cfg.pca_win),
            pca_range: [npts(cfg.pca_range.first), npts(cfg.pca_range.second)],
            amp_win: [npts(cfg.amp_win.first), npts(cfg.amp_win.second)],
            det_gap: npts(cfg.det_gap),
        }
    }
}

#[derive(Clone)]
pub struct StaLtaPca {
    config: PickerConfig,
    preprocessor: Arc<dyn Preprocess>,
}

impl Default for StaLtaPca {
    fn default() -> Self {
        Self::new(PickerConfig::default())
    }
}

impl StaLtaPca {
    pub fn new(config: PickerConfig) -> Self {
        Self::with_preprocessor(config, Arc::new(BiquadPreprocessor))
    }

    pub fn with_preprocessor(config: PickerConfig, preprocessor: Arc<dyn Preprocess>) -> Self {
        Self { config, preprocessor }
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    pub fn detections(&self, stream: &Waveform) -> Result<Vec<Detection>> {
        let Some(prepared) = self.prepare(stream)? else { return Ok(Vec::new()) };
        let data = prepared.aligned_data();
        let sample_rate = prepared.traces[0].sample_rate;
        let win = SampleWindows::new(&self.config, sample_rate);
        Ok(Scan::new(&data, sample_rate, win, &self.config).collect())
    }

    /// Accepted picks are returned in trigger order and, when `sink` is
    /// given, written to it one line each as they are found. Streams without
    /// exactly three channels yield an empty set.
    pub fn pick(&self, stream: &Waveform, mut sink: Option<&mut dyn Write>) -> Result<PickSet> {
        let Some(prepared) = self.prepare(stream)? else { return Ok(PickSet::new()) };
        let head = &prepared.traces[0];
        let net_sta = head.net_sta();
        let sample_rate = head.sample_rate;
        let start_time = head.start_time;
        let data = prepared.aligned_data();
        let win = SampleWindows::new(&self.config, sample_rate);

        info!("Picking {} ({} points at {}Hz)", net_sta, data[2].len(), sample_rate);
        let mut picks = PickSet::new();
        for det in Scan::new(&data, sample_rate, win, &self.config) {
            let tp = det.idx_p as f64 / sample_rate;
            let ts = det.idx_s as f64 / sample_rate;
            info!("{}, {}, {}", net_sta, add_secs(start_time, tp), add_secs(start_time, ts));
            if !det.is_accepted() {
                continue;
            }
            let pick = Pick {
                net_sta: net_sta.clone(),
                origin_time: add_secs(start_time, origin_offset(tp, ts)),
                tp: add_secs(start_time, tp),
                ts: add_secs(start_time, ts),
                s_amp: det.s_amp,
                p_snr: det.p_snr,
                s_snr: det.s_snr,
                freq_dom: det.freq_dom,
            };
            if let Some(out) = sink.as_mut() {
                writeln!(out, "{}", pick).context("Failed to write pick line")?;
            }
            picks.push(pick);
        }
        info!("{}: {} picks", net_sta, picks.len());
        Ok(picks)
    }

    fn prepare(&self, stream: &Waveform) -> Result<Option<Waveform>> {
        if stream.len() != 3 {
            warn!("Expected 3 channels, got {}; nothing to pick", stream.len());
            return Ok(None);
        }
        if stream.common_rate().is_none() {
            let rates: Vec<f64> = stream.traces.iter().map(|tr| tr.sample_rate).collect();
            warn!("{}: channel sample rates differ {:?}, using {}Hz", stream.traces[0].net_sta(), rates, rates[0]);
        }
        let prepared = if self.config.to_prep {
            self.preprocessor
                .preprocess(stream, &self.config.freq_band)
                .context("Preprocessing failed")?
        } else {
            stream.clone()
        };
        if prepared.len() != 3 || prepared.traces[0].sample_rate <= 0.0 {
            warn!("Preprocessed stream is not a 3-channel stream with a valid rate");
            return Ok(None);
        }
        Ok(Some(prepared))
    }
}
