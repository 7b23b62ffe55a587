use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use crate::pick::{Pick, PickSet};
use crate::picker::StaLtaPca;
use crate::wavefile::load_waveform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

pub fn write_pick(out: &mut dyn Write, pick: &Pick, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => writeln!(out, "{}", pick)?,
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(pick)?)?,
    }
    Ok(())
}

#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub picks: Result<PickSet>,
}

pub async fn pick_files(picker: Arc<StaLtaPca>, paths: Vec<PathBuf>, start_time: DateTime<Utc>, threads: usize) -> Vec<FileResult> {
    let permits = Arc::new(Semaphore::new(threads.max(1)));
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let picker = Arc::clone(&picker);
        let permits = Arc::clone(&permits);
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await;
            let job_path = path.clone();
            let picks = tokio::task::spawn_blocking(move || {
                let stream = load_waveform(&job_path, start_time)?;
                picker.pick(&stream, None)
            })
            .await
            .context("Picking worker panicked")
            .and_then(|r| r);
            FileResult { path, picks }
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => error!("Picking task failed: {}", e),
        }
    }
    results
}

/// Runs [`pick_files`] on a fresh runtime and writes the picks to `out`.
/// Files that fail are logged and skipped. Returns the number of picks.
pub fn run(picker: StaLtaPca, paths: Vec<PathBuf>, start_time: DateTime<Utc>, threads: usize, out: &mut dyn Write, format: OutputFormat) -> Result<usize> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(threads.max(1))
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    info!("Picking {} files on {} workers", paths.len(), threads);

    let results = runtime.block_on(pick_files(Arc::new(picker), paths, start_time, threads));
    let mut count = 0;
    for result in results {
        match result.picks {
            Ok(picks) => {
                for pick in &picks {
                    write_pick(out, pick, format)?;
                }
                info!("{}: {} picks", result.path.display(), picks.len());
                count += picks.len();
            }
            Err(e) => error!("Skipping {}: {:#}", result.path.display(), e),
        }
    }
    out.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PickerConfig, Window};
    use crate::synthetic::{SyntheticEvent, SyntheticStream};
    use crate::wavefile::save_waveform;

    fn picker() -> StaLtaPca {
        StaLtaPca::new(PickerConfig {
            pick_win: Window::new(1.0, 0.1),
            trig_thres: 5.0,
            p_win: Window::new(0.5, 0.5),
            s_win: Window::new(0.0, 2.0),
            pca_win: 0.5,
            pca_range: Window::new(0.0, 1.5),
            fd_thres: 1.0,
            amp_win: Window::new(0.5, 1.0),
            to_prep: false,
            ..PickerConfig::default()
        })
    }

    #[test]
    fn test_run_in_input_order_and_skip_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (i, sta) in ["ST01", "ST02", "ST03"].iter().enumerate() {
            let mut syn = SyntheticStream::new(100.0, 20.0).with_event(SyntheticEvent::new(5.0 + i as f64, 5.7 + i as f64));
            syn.station = sta.to_string();
            syn.seed = i as u64;
            let path = dir.path().join(format!("XX.{}.wav", sta));
            save_waveform(&path, &syn.build()).unwrap();
            paths.push(path);
        }
        paths.insert(1, dir.path().join("XX.MISSING.wav"));

        let mut out = Vec::new();
        let count = run(picker(), paths, DateTime::<Utc>::UNIX_EPOCH, 2, &mut out, OutputFormat::Csv).unwrap();
        assert_eq!(count, 3);
        let lines: Vec<String> = String::from_utf8(out).unwrap().lines().map(String::from).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("XX.ST01,"));
        assert!(lines[1].starts_with("XX.ST02,"));
        assert!(lines[2].starts_with("XX.ST03,"));
    }

    #[test]
    fn test_json_lines() {
        let stream = SyntheticStream::new(100.0, 20.0).with_event(SyntheticEvent::new(5.0, 5.7)).build();
        let picks = picker().pick(&stream, None).unwrap();
        let mut out = Vec::new();
        write_pick(&mut out, &picks[0], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["net_sta"], "XX.SYN");
        assert!(value["freq_dom"].as_f64().unwrap() > 1.0);
    }
}
