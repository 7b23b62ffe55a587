use nalgebra::{Matrix3, SymmetricEigen, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polarization {
    pub degree: f64,
    pub direction: Vector3<f64>,
}

fn covariance(data: &[Vec<f64>], start: usize, len: usize) -> Option<Matrix3<f64>> {
    let npts = data.iter().map(Vec::len).min()?;
    let end = start.saturating_add(len).min(npts);
    if data.len() != 3 || end <= start || end - start < 2 {
        return None;
    }
    let count = end - start;
    let chans: Vec<&[f64]> = data.iter().map(|ch| &ch[start..end]).collect();
    let means: Vec<f64> = chans.iter().map(|c| c.iter().sum::<f64>() / count as f64).collect();

    let mut cov = Matrix3::zeros();
    for a in 0..3 {
        for b in a..3 {
            let s: f64 = chans[a].iter().zip(chans[b]).map(|(x, y)| (x - means[a]) * (y - means[b])).sum();
            cov[(a, b)] = s / (count - 1) as f64;
            cov[(b, a)] = cov[(a, b)];
        }
    }
    Some(cov)
}

pub fn calc_pol(data: &[Vec<f64>], start: usize, len: usize) -> Option<Polarization> {
    let cov = covariance(data, start, len)?;
    let eig = SymmetricEigen::new(cov);
    let (imax, lam1) = eig
        .eigenvalues
        .iter()
        .cloned()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best });
    if !(lam1.is_finite() && lam1 > 0.0) {
        return None;
    }
    let lam23 = eig.eigenvalues.sum() - lam1;
    Some(Polarization {
        degree: 1.0 - 0.5 * lam23 / lam1,
        direction: eig.eigenvectors.column(imax).into_owned(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct PcaFilter {
    pub start: i64,
    pub values: Vec<f64>,
}

impl PcaFilter {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Multiplies `segment`, whose first sample sits at absolute index
    /// `segment_start`, by the weights where the two overlap.
    pub fn apply(&self, segment: &mut [f64], segment_start: i64) {
        for (k, &w) in self.values.iter().enumerate() {
            let rel = self.start + k as i64 - segment_start;
            if rel < 0 {
                continue;
            }
            match segment.get_mut(rel as usize) {
                Some(x) => *x *= w,
                None => break,
            }
        }
    }
}

/// Directionality filter around a P arrival.
///
/// Offsets moving along the P direction with high rectilinearity get a
/// weight near 0; other offsets keep a weight near 1. Offsets whose window
/// has no defined polarization keep weight 1.
pub fn calc_pca_filter(data: &[Vec<f64>], idx_p: usize, pca_win: usize, pca_range: [usize; 2], s_before: usize) -> PcaFilter {
    let anchor = idx_p as i64 - s_before as i64;
    let start = anchor - pca_range[0] as i64;
    let end = anchor + pca_range[1] as i64;
    let reference = calc_pol(data, idx_p, pca_win);

    let values = (start..end)
        .map(|idx| {
            let (Some(p), true) = (reference, idx >= 0) else { return 1.0 };
            match calc_pol(data, idx as usize, pca_win) {
                Some(s) => 1.0 - s.degree * p.direction.dot(&s.direction).abs(),
                None => 1.0,
            }
        })
        .collect();
    PcaFilter { start, values }
}
