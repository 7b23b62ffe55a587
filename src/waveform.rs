use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub network: String,
    pub station: String,
    pub channel: String,
    pub sample_rate: f64,
    pub start_time: DateTime<Utc>,
    pub data: Vec<f64>,
}

impl Trace {
    pub fn new(network: &str, station: &str, channel: &str, sample_rate: f64, start_time: DateTime<Utc>, data: Vec<f64>) -> Self {
        Self {
            network: network.to_string(),
            station: station.to_string(),
            channel: channel.to_string(),
            sample_rate,
            start_time,
            data,
        }
    }

    pub fn npts(&self) -> usize {
        self.data.len()
    }

    pub fn net_sta(&self) -> String {
        format!("{}.{}", self.network, self.station)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    pub traces: Vec<Trace>,
}

impl Waveform {
    pub fn from_channels(network: &str, station: &str, sample_rate: f64, start_time: DateTime<Utc>, channels: Vec<Vec<f64>>) -> Self {
        const NAMES: [&str; 3] = ["E", "N", "Z"];
        let traces = channels
            .into_iter()
            .enumerate()
            .map(|(i, data)| {
                let name = NAMES.get(i).map(|s| s.to_string()).unwrap_or_else(|| format!("{}", i));
                Trace::new(network, station, &name, sample_rate, start_time, data)
            })
            .collect();
        Self { traces }
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Rate shared by every trace, `None` when empty or mixed.
    pub fn common_rate(&self) -> Option<f64> {
        let rate = self.traces.first()?.sample_rate;
        self.traces.iter().all(|tr| tr.sample_rate == rate).then_some(rate)
    }

    pub fn min_npts(&self) -> usize {
        self.traces.iter().map(Trace::npts).min().unwrap_or(0)
    }

    pub fn aligned_data(&self) -> Vec<Vec<f64>> {
        let npts = self.min_npts();
        self.traces.iter().map(|tr| tr.data[..npts].to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_aligned_data_truncates() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let st = Waveform::from_channels("XX", "ST01", 100.0, t0, vec![vec![1.0; 10], vec![2.0; 8], vec![3.0; 9]]);
        assert_eq!(st.len(), 3);
        assert_eq!(st.traces[2].channel, "Z");
        let data = st.aligned_data();
        assert!(data.iter().all(|ch| ch.len() == 8));
        assert_eq!(st.traces[0].net_sta(), "XX.ST01");
    }

    #[test]
    fn test_common_rate() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut st = Waveform::from_channels("XX", "A", 100.0, t0, vec![vec![0.0; 4]; 3]);
        assert_eq!(st.common_rate(), Some(100.0));
        st.traces[1].sample_rate = 50.0;
        assert_eq!(st.common_rate(), None);
        assert_eq!(Waveform::default().common_rate(), None);
    }
}
