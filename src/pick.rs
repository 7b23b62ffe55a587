use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::util::{format_time, time_parser};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub net_sta: String,
    pub origin_time: DateTime<Utc>,
    pub tp: DateTime<Utc>,
    pub ts: DateTime<Utc>,
    pub s_amp: f64,
    pub p_snr: f64,
    pub s_snr: f64,
    pub freq_dom: f64,
}

pub type PickSet = Vec<Pick>;

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{:.2},{:.2},{:.2}",
            self.net_sta,
            format_time(&self.origin_time),
            format_time(&self.tp),
            format_time(&self.ts),
            self.s_amp,
            self.p_snr,
            self.s_snr,
            self.freq_dom
        )
    }
}

impl FromStr for Pick {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
        if fields.len() != 8 {
            return Err(anyhow!("Expected 8 fields in pick line, got {}", fields.len()));
        }
        let time = |s: &str| time_parser(s).map_err(|e| anyhow!(e));
        let num = |name: &str, s: &str| s.parse::<f64>().with_context(|| format!("Invalid {}: {}", name, s));
        Ok(Pick {
            net_sta: fields[0].to_string(),
            origin_time: time(fields[1])?,
            tp: time(fields[2])?,
            ts: time(fields[3])?,
            s_amp: num("s_amp", fields[4])?,
            p_snr: num("p_snr", fields[5])?,
            s_snr: num("s_snr", fields[6])?,
            freq_dom: num("freq_dom", fields[7])?,
        })
    }
}

pub fn parse_picks(text: &str) -> Result<PickSet> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| l.parse::<Pick>().with_context(|| format!("Bad pick on line {}", i + 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Pick {
        let t = |ms: i64| Utc.with_ymd_and_hms(2019, 7, 4, 0, 0, 0).unwrap() + chrono::Duration::milliseconds(ms);
        Pick {
            net_sta: "XX.ST01".to_string(),
            origin_time: t(4050),
            tp: t(4990),
            ts: t(5700),
            s_amp: 0.125,
            p_snr: 12345.678,
            s_snr: 98.7654,
            freq_dom: 5.5,
        }
    }

    #[test]
    fn test_line_format() {
        assert_eq!(
            sample().to_string(),
            "XX.ST01,2019-07-04T00:00:04.050000Z,2019-07-04T00:00:04.990000Z,2019-07-04T00:00:05.700000Z,0.125,12345.68,98.77,5.50"
        );
    }

    #[test]
    fn test_parse_pick_file() {
        let text = format!("{}\n\n{}\n", sample(), sample());
        let picks = parse_picks(&text).unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].tp, sample().tp);
        assert_eq!(picks[0].p_snr, 12345.68);
        assert!(parse_picks("XX.ST01,not,enough").is_err());
    }
}
