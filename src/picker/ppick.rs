use crate::util::amax;
use super::cf::{calc_cf, StaLtaWindow};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PPick {
    pub idx_p: usize,
    pub snr: f64,
}

/// Refines a trigger into a P onset: the first sample of the local
/// characteristic function that reaches `pick_thres` of its maximum.
pub fn pick_p(z: &[f64], idx_trig: usize, p_win: [usize; 2], win: StaLtaWindow, pick_thres: f64) -> Option<PPick> {
    let lead = p_win[0] + win.lwin;
    if idx_trig < lead || idx_trig >= z.len() {
        return None;
    }
    let start = idx_trig - lead;
    let end = (idx_trig + p_win[1] + win.swin).min(z.len());
    let cf = calc_cf(&z[start..end], win);
    let peak = amax(&cf);
    let offset = cf.iter().position(|&v| v >= pick_thres * peak).unwrap_or(0);
    Some(PPick { idx_p: start + offset, snr: peak })
}
