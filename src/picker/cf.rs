use log::warn;
use crate::util::cumsum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaLtaWindow {
    pub lwin: usize,
    pub swin: usize,
}

/// Energy STA/LTA characteristic function.
///
/// The STA looks forward from each sample and the LTA looks back, so the
/// ratio peaks right before an energy onset. Samples before the first full
/// long window are zero. Input shorter than `lwin + swin` gives a single
/// zero sample. Non-finite ratios are zeroed.
pub fn calc_cf(data: &[f64], win: StaLtaWindow) -> Vec<f64> {
    let StaLtaWindow { lwin, swin } = win;
    let npts = data.len();
    if npts < lwin + swin {
        warn!("CF input too short: {} samples for windows [{}, {}]", npts, lwin, swin);
        return vec![0.0];
    }

    let energy = cumsum(data.iter().map(|&x| x * x));
    let mut sta = vec![0.0; npts];
    let mut lta = vec![1.0; npts];

    if swin > 0 {
        for i in 0..npts - swin {
            sta[i] = (energy[i + swin] - energy[i]) / swin as f64;
        }
    }
    if lwin > 0 {
        for i in lwin..npts {
            lta[i] = energy[i] - energy[i - lwin];
        }
        lta.iter_mut().for_each(|x| *x /= lwin as f64);
    }
    sta.iter_mut().take(lwin).for_each(|x| *x = 0.0);

    sta.iter()
        .zip(lta.iter())
        .map(|(s, l)| {
            let r = s / l;
            if r.is_finite() { r } else { 0.0 }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIN: StaLtaWindow = StaLtaWindow { lwin: 20, swin: 5 };

    #[test]
    fn test_output_length_matches_input() {
        let data: Vec<f64> = (0..200).map(|i| (i as f64 * 0.3).sin()).collect();
        assert_eq!(calc_cf(&data, WIN).len(), data.len());
    }

    #[test]
    fn test_too_short_gives_single_zero() {
        assert_eq!(calc_cf(&[1.0; 24], WIN), vec![0.0]);
        assert_eq!(calc_cf(&[], WIN), vec![0.0]);
        assert_eq!(calc_cf(&[1.0; 25], WIN).len(), 25);
    }

    #[test]
    fn test_zero_energy_is_finite() {
        let cf = calc_cf(&[0.0; 100], WIN);
        assert!(cf.iter().all(|x| x.is_finite()));
        assert!(cf.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_leading_long_window_is_zero() {
        let data = vec![1.0; 100];
        let cf = calc_cf(&data, WIN);
        assert!(cf[..20].iter().all(|&x| x == 0.0));
        // constant energy: ratio 1 wherever the short window is full
        assert!((cf[50] - 1.0).abs() < 1e-12);
        assert_eq!(cf[99], 0.0);
    }

    #[test]
    fn test_peaks_before_onset() {
        let mut data = vec![0.1; 200];
        for x in data[100..].iter_mut() { *x = 1.0; }
        let cf = calc_cf(&data, WIN);
        let peak = crate::util::argmax(&cf).unwrap();
        assert!((95..=100).contains(&peak), "peak at {}", peak);
        assert!(cf[peak] > 50.0);
    }
}
