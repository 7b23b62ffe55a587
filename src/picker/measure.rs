use rustfft::{num_complex::Complex, FftPlanner};
use crate::util::{argmax, cumsum, demean};

pub const VP: f64 = 5.9;
pub const VS: f64 = 3.4;

pub fn s_amplitude(data: &[Vec<f64>], start: usize, end: usize, sample_rate: f64) -> f64 {
    let npts = data.iter().map(Vec::len).min().unwrap_or(0);
    let end = end.min(npts);
    if end <= start {
        return 0.0;
    }
    let disp: Vec<Vec<f64>> = data
        .iter()
        .map(|ch| cumsum(demean(&ch[start..end]).into_iter().map(|v| v / sample_rate)))
        .collect();
    (0..end - start)
        .map(|i| disp.iter().map(|d| d[i] * d[i]).sum::<f64>())
        .fold(0.0, f64::max)
        .sqrt()
}

pub fn origin_offset(tp: f64, ts: f64) -> f64 {
    let dist = (ts - tp) / (1.0 / VS - 1.0 / VP);
    tp - dist / VP
}

pub struct SpectrumAnalyzer {
    sample_rate: f64,
    planner: FftPlanner<f64>,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate, planner: FftPlanner::new() }
    }

    pub fn freq_dom(&mut self, data: &[f64]) -> f64 {
        let npts = data.len();
        if npts / 2 == 0 {
            return 0.0;
        }
        let fft = self.planner.plan_fft_forward(npts);
        let mut buffer: Vec<Complex<f64>> = demean(data).into_iter().map(|x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buffer);
        let psd: Vec<f64> = buffer.iter().take(npts / 2).map(|c| c.norm_sqr()).collect();
        argmax(&psd).unwrap_or(0) as f64 * self.sample_rate / npts as f64
    }

    pub fn pick_freq_dom(&mut self, data: &[Vec<f64>], idx_p: usize, idx_s: usize) -> f64 {
        let npts = data.iter().map(Vec::len).min().unwrap_or(0);
        if npts == 0 {
            return 0.0;
        }
        let i0 = idx_p.min(idx_s);
        let mid = (idx_p as f64 + (idx_s as f64 - idx_p as f64) / 2.0).floor() as usize;
        let i1 = mid.min(npts - 1);
        if i0 > i1 {
            return 0.0;
        }
        data.iter().map(|ch| self.freq_dom(&ch[i0..=i1])).fold(0.0, f64::max)
    }
}
