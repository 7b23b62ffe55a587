use log::{debug, info};
use serde::Serialize;
use crate::config::PickerConfig;
use super::cf::calc_cf;
use super::measure::{s_amplitude, SpectrumAnalyzer};
use super::polarization::calc_pca_filter;
use super::ppick::pick_p;
use super::spick::{pick_s, s_range};
use super::trigger::{detect_triggers, next_after};
use super::SampleWindows;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Accepted,
    NonCausal,
    LowFrequency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub idx_trig: usize,
    pub idx_p: usize,
    pub idx_s: usize,
    pub s_amp: f64,
    pub p_snr: f64,
    pub s_snr: f64,
    pub freq_dom: f64,
    pub verdict: Verdict,
}

impl Detection {
    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }

    pub fn last_index(&self) -> usize {
        self.idx_trig.max(self.idx_s).max(self.idx_p)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning(usize),
    Done,
}

enum Step {
    Skip,
    EndOfData,
    Evaluated(Detection),
}

/// Walks the vertical-channel triggers of one stream and yields every
/// evaluated detection in trigger order.
///
/// After an evaluated detection the cursor jumps to the first trigger past
/// `last_index() + det_gap`; a skipped trigger advances it by one.
pub struct Scan<'a> {
    data: &'a [Vec<f64>],
    npts: usize,
    sample_rate: f64,
    win: SampleWindows,
    config: &'a PickerConfig,
    triggers: Vec<usize>,
    spectrum: SpectrumAnalyzer,
    state: ScanState,
}

impl<'a> Scan<'a> {
    pub fn new(data: &'a [Vec<f64>], sample_rate: f64, win: SampleWindows, config: &'a PickerConfig) -> Self {
        let npts = data.iter().map(Vec::len).min().unwrap_or(0);
        let triggers = match data.get(2) {
            Some(z) => detect_triggers(&calc_cf(z, win.pick_win), config.trig_thres),
            None => Vec::new(),
        };
        info!("Triggered {} samples over {} points", triggers.len(), npts);
        let state = if triggers.is_empty() { ScanState::Done } else { ScanState::Scanning(0) };
        Self {
            data,
            npts,
            sample_rate,
            win,
            config,
            triggers,
            spectrum: SpectrumAnalyzer::new(sample_rate),
            state,
        }
    }

    pub fn triggers(&self) -> &[usize] {
        &self.triggers
    }

    fn skip_one(&self, pos: usize) -> ScanState {
        if pos + 1 < self.triggers.len() { ScanState::Scanning(pos + 1) } else { ScanState::Done }
    }

    fn jump_past(&self, index: usize) -> ScanState {
        match next_after(&self.triggers, index) {
            Some(pos) => ScanState::Scanning(pos),
            None => ScanState::Done,
        }
    }

    fn evaluate(&mut self, idx_trig: usize) -> Step {
        let w = self.win;
        let Some(p) = pick_p(&self.data[2], idx_trig, w.p_win, w.pick_win, self.config.pick_thres) else {
            debug!("Trigger {} too close to stream start, skipped", idx_trig);
            return Step::Skip;
        };
        if self.npts < p.idx_p + w.s_win[1] {
            debug!("No room for S search after P at {}", p.idx_p);
            return Step::EndOfData;
        }
        if s_range(self.npts, p.idx_p, w.s_win, w.pick_win).is_none() {
            debug!("S search before stream start for P at {}, skipped", p.idx_p);
            return Step::Skip;
        }

        let filter = calc_pca_filter(self.data, p.idx_p, w.pca_win, w.pca_range, w.s_win[0]);
        let Some(s) = pick_s(self.data, p.idx_p, w.s_win, w.pick_win, &filter) else {
            debug!("Empty S search for P at {}, skipped", p.idx_p);
            return Step::Skip;
        };

        let amp_start = p.idx_p.saturating_sub(w.amp_win[0]);
        let s_amp = s_amplitude(self.data, amp_start, s.idx_s + w.amp_win[1], self.sample_rate);
        let freq_dom = self.spectrum.pick_freq_dom(self.data, p.idx_p, s.idx_s);

        let verdict = if p.idx_p >= s.idx_s {
            Verdict::NonCausal
        } else if freq_dom <= self.config.fd_thres {
            Verdict::LowFrequency
        } else {
            Verdict::Accepted
        };
        debug!("Trigger {}: P {} S {} fd {:.2} -> {:?}", idx_trig, p.idx_p, s.idx_s, freq_dom, verdict);

        Step::Evaluated(Detection {
            idx_trig,
            idx_p: p.idx_p,
            idx_s: s.idx_s,
            s_amp,
            p_snr: p.snr,
            s_snr: s.snr,
            freq_dom,
            verdict,
        })
    }
}

impl Iterator for Scan<'_> {
    type Item = Detection;

    fn next(&mut self) -> Option<Detection> {
        loop {
            let ScanState::Scanning(pos) = self.state else { return None };
            let idx_trig = self.triggers[pos];
            match self.evaluate(idx_trig) {
                Step::Skip => self.state = self.skip_one(pos),
                Step::EndOfData => self.state = ScanState::Done,
                Step::Evaluated(det) => {
                    self.state = self.jump_past(det.last_index() + self.win.det_gap);
                    return Some(det);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Window;

    fn config() -> PickerConfig {
        PickerConfig {
            pick_win: Window::new(0.5, 0.05),
            trig_thres: 5.0,
            p_win: Window::new(0.3, 0.3),
            s_win: Window::new(0.0, 1.0),
            pca_win: 0.3,
            pca_range: Window::new(0.0, 0.8),
            fd_thres: 1.0,
            amp_win: Window::new(0.2, 0.5),
            det_gap: 2.0,
            to_prep: false,
            ..PickerConfig::default()
        }
    }

    #[test]
    fn test_no_triggers_is_done() {
        let data = vec![vec![0.0; 500], vec![0.0; 500], vec![0.0; 500]];
        let cfg = config();
        let mut scan = Scan::new(&data, 100.0, SampleWindows::new(&cfg, 100.0), &cfg);
        assert!(scan.triggers().is_empty());
        assert!(scan.next().is_none());
    }

    fn tone(data: &mut [f64], from: usize, to: usize) {
        for (i, x) in data.iter_mut().enumerate().take(to).skip(from) {
            *x = (i as f64 * 1.3).sin();
        }
    }

    #[test]
    fn test_early_triggers_skip_and_scan_continues() {
        // early burst triggers before p_before + lwin, a later event fits
        let n = 800;
        let mut z = vec![0.001; n];
        tone(&mut z, 60, 110);
        tone(&mut z, 400, n);
        let mut h = vec![0.001; n];
        tone(&mut h, 470, n);
        let data = vec![h.clone(), h, z];
        let cfg = config();
        let scan = Scan::new(&data, 100.0, SampleWindows::new(&cfg, 100.0), &cfg);
        assert!(scan.triggers().iter().any(|&t| t < 80));
        assert!(scan.triggers().iter().any(|&t| t > 380));

        let dets: Vec<Detection> = scan.collect();
        assert_eq!(dets.len(), 1);
        assert!(dets[0].idx_trig > 380, "{:?}", dets[0]);
    }

    #[test]
    fn test_end_of_data_ends_scan() {
        let n = 700;
        let mut z = vec![0.001; n];
        tone(&mut z, 200, n);
        let mut h = vec![0.001; n];
        tone(&mut h, 270, n);
        let data = vec![h.clone(), h, z];
        let cfg = config();
        let win = SampleWindows::new(&cfg, 100.0);

        let first = Scan::new(&data, 100.0, win, &cfg).triggers()[0];
        assert_eq!(Scan::new(&data, 100.0, win, &cfg).count(), 1);

        // a trigger with no room for S ahead of one that would be evaluated
        let mut scan = Scan::new(&data, 100.0, win, &cfg);
        assert!(matches!(scan.evaluate(690), Step::EndOfData));
        scan.triggers = vec![690, first];
        scan.state = ScanState::Scanning(0);
        assert!(scan.next().is_none());
        assert_eq!(scan.state, ScanState::Done);
    }
}
