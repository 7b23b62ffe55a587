use anyhow::{anyhow, bail, Result};
use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type, Q_BUTTERWORTH_F64};
use log::debug;
use serde::{Deserialize, Serialize};
use crate::waveform::Waveform;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FrequencyBand {
    Highpass { freq: f64 },
    Lowpass { freq: f64 },
    Bandpass { low: f64, high: f64 },
}

impl FrequencyBand {
    pub fn from_parts(kind: &str, corners: &[f64]) -> Result<Self> {
        match (kind.to_ascii_lowercase().as_str(), corners) {
            ("highpass", [f]) => Ok(FrequencyBand::Highpass { freq: *f }),
            ("lowpass", [f]) => Ok(FrequencyBand::Lowpass { freq: *f }),
            ("bandpass", [lo, hi]) => Ok(FrequencyBand::Bandpass { low: *lo, high: *hi }),
            _ => Err(anyhow!("Invalid frequency band: {} {:?}", kind, corners)),
        }
    }
}

impl std::str::FromStr for FrequencyBand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let kind = parts.next().unwrap_or_default();
        let corners = parts
            .map(|p| p.trim().parse::<f64>().map_err(|e| anyhow!("Invalid corner '{}': {}", p, e)))
            .collect::<Result<Vec<_>>>()?;
        Self::from_parts(kind, &corners)
    }
}

pub trait Preprocess: Send + Sync {
    fn preprocess(&self, stream: &Waveform, band: &FrequencyBand) -> Result<Waveform>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadPreprocessor;

impl Preprocess for BiquadPreprocessor {
    fn preprocess(&self, stream: &Waveform, band: &FrequencyBand) -> Result<Waveform> {
        let mut out = stream.clone();
        for trace in out.traces.iter_mut() {
            detrend(&mut trace.data);
            apply_band(&mut trace.data, trace.sample_rate, band)?;
            debug!("Preprocessed {}.{} {} ({} samples)", trace.network, trace.station, trace.channel, trace.data.len());
        }
        Ok(out)
    }
}

pub fn forward_backward_filter<F: Biquad<f64>>(signal: &mut [f64], filter: &mut F) {
    signal.iter_mut().for_each(|x| *x = filter.run(*x));
    filter.reset_state();
    signal.reverse();
    signal.iter_mut().for_each(|x| *x = filter.run(*x));
    filter.reset_state();
    signal.reverse();
}

pub fn make_coefficients(f_type: Type<f64>, fs: f64, freq: f64, q: f64) -> Result<Coefficients<f64>> {
    if !(freq > 0.0 && freq < fs / 2.0) {
        bail!("Corner frequency {}Hz outside (0, {}Hz)", freq, fs / 2.0);
    }
    Coefficients::<f64>::from_params(f_type, fs.hz(), freq.hz(), q).map_err(|_| anyhow!("Failed to create filter coefficients"))
}

pub fn detrend(data: &mut [f64]) {
    let n = data.len();
    if n < 2 {
        data.iter_mut().for_each(|x| *x = 0.0);
        return;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = data.iter().sum::<f64>() / nf;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in data.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    for (i, y) in data.iter_mut().enumerate() {
        *y -= y_mean + slope * (i as f64 - x_mean);
    }
}

pub fn apply_band(data: &mut [f64], fs: f64, band: &FrequencyBand) -> Result<()> {
    match *band {
        FrequencyBand::Highpass { freq } => {
            let mut hpf = DirectForm1::<f64>::new(make_coefficients(Type::HighPass, fs, freq, Q_BUTTERWORTH_F64)?);
            forward_backward_filter(data, &mut hpf);
        }
        FrequencyBand::Lowpass { freq } => {
            let mut lpf = DirectForm1::<f64>::new(make_coefficients(Type::LowPass, fs, freq, Q_BUTTERWORTH_F64)?);
            forward_backward_filter(data, &mut lpf);
        }
        FrequencyBand::Bandpass { low, high } => {
            if low >= high {
                bail!("Bandpass corners out of order: {} >= {}", low, high);
            }
            let mut hpf = DirectForm1::<f64>::new(make_coefficients(Type::HighPass, fs, low, Q_BUTTERWORTH_F64)?);
            let mut lpf = DirectForm1::<f64>::new(make_coefficients(Type::LowPass, fs, high, Q_BUTTERWORTH_F64)?);
            forward_backward_filter(data, &mut hpf);
            forward_backward_filter(data, &mut lpf);
        }
    }
    Ok(())
}
