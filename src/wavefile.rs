use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use crate::waveform::Waveform;

pub fn station_from_path(path: &Path) -> (String, String) {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let mut parts = stem.split('.');
    match (parts.next(), parts.next()) {
        (Some(net), Some(sta)) => (net.to_string(), sta.to_string()),
        (Some(sta), None) => (String::new(), sta.to_string()),
        _ => (String::new(), String::new()),
    }
}

pub fn load_channels<P: AsRef<Path>>(path: P) -> Result<(Vec<Vec<f64>>, u32)> {
    let path = path.as_ref();
    info!("Loading waveform from {}", path.display());

    let file = File::open(path).with_context(|| format!("Failed to open waveform file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(ReadOnlySource::new(BufReader::new(file))), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| "Failed to probe waveform format")?;
    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .with_context(|| "No supported tracks found")?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.context("Waveform has no sample rate")?;
    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| "Failed to create decoder")?;

    let mut channels: Vec<Vec<f64>> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::ResetRequired) => {
                debug!("Decoder reset required");
                continue;
            }
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let duration = decoded.capacity() as u64;
                if duration == 0 {
                    continue;
                }
                let count = spec.channels.count();
                if channels.is_empty() {
                    channels = vec![Vec::new(); count];
                }
                let mut sample_buf = SampleBuffer::<f64>::new(duration, spec);
                sample_buf.copy_interleaved_ref(decoded);
                for frame in sample_buf.samples().chunks(count) {
                    for (ch, &x) in channels.iter_mut().zip(frame) {
                        ch.push(x);
                    }
                }
            }
            Err(symphonia::core::errors::Error::DecodeError(_)) => {
                debug!("Decode error encountered, skipping packet");
                continue;
            }
            Err(e) => return Err(anyhow::anyhow!("Decode error: {}", e)),
        }
    }

    info!("Loaded {} channels x {} samples at {}Hz", channels.len(), channels.first().map_or(0, Vec::len), sample_rate);
    Ok((channels, sample_rate))
}

pub fn load_waveform<P: AsRef<Path>>(path: P, start_time: DateTime<Utc>) -> Result<Waveform> {
    let path = path.as_ref();
    let (channels, sample_rate) = load_channels(path)?;
    let (network, station) = station_from_path(path);
    Ok(Waveform::from_channels(&network, &station, sample_rate as f64, start_time, channels))
}

pub fn save_waveform<P: AsRef<Path>>(path: P, stream: &Waveform) -> Result<()> {
    let path = path.as_ref();
    info!("Saving waveform to {}", path.display());
    if stream.is_empty() {
        bail!("Cannot write a waveform without channels");
    }
    let sample_rate = stream.traces[0].sample_rate;
    if sample_rate.fract() != 0.0 || sample_rate <= 0.0 {
        bail!("WAV needs an integral sample rate, got {}", sample_rate);
    }
    let data = stream.aligned_data();
    write_wav(path, &data, sample_rate as u32)
}

fn write_wav<P: AsRef<Path>>(path: P, channels: &[Vec<f64>], sample_rate: u32) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    let num_channels = channels.len() as u16;
    let bits_per_sample = 32u16;
    let block_align = num_channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * block_align as u32;
    let frames = channels.first().map_or(0, Vec::len);
    let data_size = (frames * block_align as usize) as u32;

    debug!("Writing WAV: channels={}, bits={}, rate={}, size={}", num_channels, bits_per_sample, sample_rate, data_size);

    file.write_all(b"RIFF")?;
    file.write_all(&(36 + data_size).to_le_bytes())?;
    file.write_all(b"WAVE")?;

    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;
    file.write_all(&3u16.to_le_bytes())?;
    file.write_all(&num_channels.to_le_bytes())?;
    file.write_all(&sample_rate.to_le_bytes())?;
    file.write_all(&byte_rate.to_le_bytes())?;
    file.write_all(&block_align.to_le_bytes())?;
    file.write_all(&bits_per_sample.to_le_bytes())?;

    file.write_all(b"data")?;
    file.write_all(&data_size.to_le_bytes())?;
    for i in 0..frames {
        for ch in channels {
            file.write_all(&(ch[i] as f32).to_le_bytes())?;
        }
    }
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{SyntheticEvent, SyntheticStream};

    #[test]
    fn test_station_from_path() {
        assert_eq!(station_from_path(Path::new("/data/XX.ST01.wav")), ("XX".to_string(), "ST01".to_string()));
        assert_eq!(station_from_path(Path::new("XX.ST01.20190704.wav")), ("XX".to_string(), "ST01".to_string()));
        assert_eq!(station_from_path(Path::new("ST01.wav")), (String::new(), "ST01".to_string()));
    }

    #[test]
    fn test_wav_keeps_channels_apart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("XX.SYN.wav");
        let stream = SyntheticStream::new(100.0, 4.0).with_event(SyntheticEvent::new(1.0, 1.5)).build();
        save_waveform(&path, &stream).unwrap();

        let loaded = load_waveform(&path, stream.traces[0].start_time).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.traces[0].net_sta(), "XX.SYN");
        assert_eq!(loaded.traces[0].sample_rate, 100.0);
        assert_eq!(loaded.min_npts(), 400);
        for (a, b) in loaded.traces.iter().zip(&stream.traces) {
            let err = a.data.iter().zip(&b.data).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max);
            assert!(err < 1e-5, "{} differs by {}", a.channel, err);
        }
    }

    #[test]
    fn test_fractional_rate_rejected() {
        let stream = SyntheticStream::new(31.25, 1.0).build();
        let dir = tempfile::tempdir().unwrap();
        assert!(save_waveform(dir.path().join("a.wav"), &stream).is_err());
    }
}
