use crate::util::argmax;
use super::cf::{calc_cf, StaLtaWindow};
use super::polarization::PcaFilter;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SPick {
    pub idx_s: usize,
    pub snr: f64,
}

pub fn s_range(npts: usize, idx_p: usize, s_win: [usize; 2], win: StaLtaWindow) -> Option<(usize, usize)> {
    let start = idx_p.checked_sub(s_win[0] + win.lwin)?;
    let end = (idx_p + s_win[1] + win.swin).min(npts);
    (end > start).then_some((start, end))
}

/// Searches for the S onset after `idx_p` on the horizontal energy.
///
/// The PCA filter removes P-polarized energy, the filtered peak gives a
/// coarse S trigger, and the onset is the CF maximum between the midpoint
/// of `[lwin, s_trig]` and `s_trig`.
pub fn pick_s(data: &[Vec<f64>], idx_p: usize, s_win: [usize; 2], win: StaLtaWindow, filter: &PcaFilter) -> Option<SPick> {
    let npts = data.iter().map(Vec::len).min()?;
    let (start, end) = s_range(npts, idx_p, s_win, win)?;
    let (east, north) = (&data[0], &data[1]);

    let mut energy: Vec<f64> = (start..end).map(|i| (east[i] * east[i] + north[i] * north[i]).sqrt()).collect();
    let cf = calc_cf(&energy, win);
    filter.apply(&mut energy, start as i64);

    let s_trig = argmax(energy.get(win.lwin..)?)? + win.lwin;
    let mid = (s_trig + win.lwin) / 2;
    let (lo, mut hi) = (mid.min(s_trig), mid.max(s_trig));
    if lo == hi {
        hi += 1;
    }
    let search = cf.get(lo..hi.min(cf.len()))?;
    let k = argmax(search)?;
    Some(SPick { idx_s: start + lo + k, snr: search[k] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::polarization::calc_pca_filter;

    const WIN: StaLtaWindow = StaLtaWindow { lwin: 50, swin: 5 };

    fn burst(n: usize, onset: usize, amp: f64, f: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let noise = 0.001 * ((i * 7919 % 13) as f64 - 6.0);
                if i < onset { return noise; }
                let t = (i - onset) as f64 / 100.0;
                noise + amp * (-t / 0.5).exp() * (2.0 * std::f64::consts::PI * f * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_s_range() {
        assert_eq!(s_range(1000, 100, [0, 200], WIN), Some((50, 305)));
        assert_eq!(s_range(200, 100, [0, 200], WIN), Some((50, 200)));
        assert_eq!(s_range(1000, 40, [0, 200], WIN), None);
    }

    #[test]
    fn test_pick_decaying_s() {
        let n = 800;
        let data = vec![burst(n, 300, 4.0, 4.0), burst(n, 0, 0.0, 1.0), burst(n, 200, 1.0, 5.0)];
        let filter = calc_pca_filter(&data, 200, 30, [0, 150], 0);
        let s = pick_s(&data, 200, [0, 200], WIN, &filter).unwrap();
        assert!((295..=305).contains(&s.idx_s), "idx_s {}", s.idx_s);
        assert!(s.snr > 10.0);
    }

    #[test]
    fn test_collapsed_search_is_widened() {
        let data = vec![vec![1.0; 400], vec![0.0; 400], vec![0.0; 400]];
        let filter = PcaFilter { start: 0, values: vec![] };
        // flat energy: coarse trigger at lwin, half window empty
        let s = pick_s(&data, 100, [0, 100], WIN, &filter).unwrap();
        assert_eq!(s.idx_s, 100);
    }

    #[test]
    fn test_segment_before_stream() {
        let data = vec![vec![1.0; 400], vec![0.0; 400], vec![0.0; 400]];
        let filter = PcaFilter { start: 0, values: vec![] };
        assert!(pick_s(&data, 20, [0, 100], WIN, &filter).is_none());
    }
}
