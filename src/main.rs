use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process;
use palpick::args::{Cli, Commands};
use palpick::config::PalConfig;
use palpick::picker::StaLtaPca;
use palpick::runner;
use palpick::synthetic::{SyntheticEvent, SyntheticStream};
use palpick::wavefile;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = PalConfig::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Pick { files, start, out, format, threads, no_prep, freq_band } => {
            let mut picker_config = config.picker_config()?;
            if no_prep {
                picker_config.to_prep = false;
            }
            if let Some(band) = freq_band {
                picker_config.freq_band = band;
            }
            let threads = threads.unwrap_or_else(|| config.threads());

            let mut sink: Box<dyn Write> = match &out {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
                )),
                None => Box::new(io::stdout().lock()),
            };
            let count = runner::run(StaLtaPca::new(picker_config), files, start, threads, &mut *sink, format)?;
            log::info!("Wrote {} picks", count);
        }
        Commands::Synth { out, duration, sample_rate, seed, noise, events } => {
            let mut syn = SyntheticStream::new(sample_rate as f64, duration);
            syn.seed = seed;
            syn.noise = noise;
            if let Some((network, station)) = out
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.split_once('.'))
            {
                syn.network = network.to_string();
                syn.station = station.split('.').next().unwrap_or(station).to_string();
            }
            let events = if events.is_empty() { vec![(duration / 4.0, duration / 4.0 + 1.0)] } else { events };
            for (p, s) in events {
                syn = syn.with_event(SyntheticEvent::new(p, s));
            }
            wavefile::save_waveform(&out, &syn.build())
                .with_context(|| format!("Failed to save waveform to {}", out.display()))?;
            println!("Wrote {}", out.display());
        }
    }
    Ok(())
}
