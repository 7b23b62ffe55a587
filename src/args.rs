use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use crate::filter::FrequencyBand;
use crate::runner::OutputFormat;
use crate::util::time_parser;

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Single-station STA/LTA + PCA seismic phase picker.")]
pub struct Cli {
    /// KDL config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pick P and S arrivals from 3-channel (E, N, Z) WAV files named NET.STA.wav
    Pick {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Start time of every input stream
        #[arg(long, value_parser = time_parser, default_value = "1970-01-01T00:00:00Z")]
        start: DateTime<Utc>,
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
        /// Worker count (overrides the config file)
        #[arg(long)]
        threads: Option<usize>,
        /// Skip preprocessing
        #[arg(long)]
        no_prep: bool,
        /// Preprocessing band, e.g. highpass:1 or bandpass:2:40
        #[arg(long, value_parser = band_parser)]
        freq_band: Option<FrequencyBand>,
    },
    /// Write a synthetic 3-channel event waveform
    Synth {
        out: PathBuf,
        #[arg(long, default_value_t = 60.0)]
        duration: f64,
        #[arg(long, default_value_t = 100)]
        sample_rate: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 0.01)]
        noise: f64,
        /// Event as P_ONSET:S_ONSET seconds; repeatable
        #[arg(long = "event", value_parser = event_parser)]
        events: Vec<(f64, f64)>,
    },
}

pub fn band_parser(s: &str) -> Result<FrequencyBand, String> {
    s.parse::<FrequencyBand>().map_err(|e| e.to_string())
}

pub fn event_parser(s: &str) -> Result<(f64, f64), String> {
    let (p, s_onset) = s.split_once(':').ok_or_else(|| format!("Expected P_ONSET:S_ONSET, got '{}'", s))?;
    let p: f64 = p.trim().parse().map_err(|e| format!("Invalid P onset '{}': {}", p, e))?;
    let s_onset: f64 = s_onset.trim().parse().map_err(|e| format!("Invalid S onset '{}': {}", s_onset, e))?;
    if s_onset <= p {
        return Err(format!("S onset {} must follow P onset {}", s_onset, p));
    }
    Ok((p, s_onset))
}
