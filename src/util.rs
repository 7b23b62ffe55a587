use chrono::{DateTime, Duration, NaiveDateTime, Utc};

pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub fn secs_to_npts(sample_rate: f64, secs: f64) -> usize {
    let npts = sample_rate * secs;
    if npts.is_finite() && npts > 0.0 { npts as usize } else { 0 }
}

pub fn argmax(data: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &x) in data.iter().enumerate() {
        match best {
            Some((_, b)) if x <= b => {}
            _ => best = Some((i, x)),
        }
    }
    best.map(|(i, _)| i)
}

pub fn amax(data: &[f64]) -> f64 {
    data.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() { return 0.0; }
    data.iter().sum::<f64>() / data.len() as f64
}

pub fn demean(data: &[f64]) -> Vec<f64> {
    let m = mean(data);
    data.iter().map(|&x| x - m).collect()
}

pub fn cumsum<I: IntoIterator<Item = f64>>(iter: I) -> Vec<f64> {
    let mut acc = 0.0;
    iter.into_iter().map(|x| { acc += x; acc }).collect()
}

pub fn add_secs(t: DateTime<Utc>, secs: f64) -> DateTime<Utc> {
    t + Duration::nanoseconds((secs * 1e9).round() as i64)
}

pub fn secs_between(t0: DateTime<Utc>, t1: DateTime<Utc>) -> f64 {
    let d = t1 - t0;
    match d.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => d.num_milliseconds() as f64 / 1e3,
    }
}

pub fn format_time(t: &DateTime<Utc>) -> String {
    t.format(TIME_FORMAT).to_string()
}

pub fn time_parser(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .map(|t| t.and_utc())
        .map_err(|e| format!("Invalid time '{}': {}", s, e))
}
