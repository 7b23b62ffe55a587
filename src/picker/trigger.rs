pub fn detect_triggers(cf: &[f64], threshold: f64) -> Vec<usize> {
    cf.iter()
        .enumerate()
        .filter(|(_, &v)| v > threshold)
        .map(|(i, _)| i)
        .collect()
}

pub fn next_after(triggers: &[usize], index: usize) -> Option<usize> {
    let pos = triggers.partition_point(|&t| t <= index);
    (pos < triggers.len()).then_some(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_increasing() {
        let cf = vec![0.0, 20.0, 20.0, 3.0, 16.0, 15.0, 40.0];
        let trig = detect_triggers(&cf, 15.0);
        assert_eq!(trig, vec![1, 2, 4, 6]);
        assert!(trig.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_next_after() {
        let trig = vec![3, 7, 9, 20];
        assert_eq!(next_after(&trig, 7), Some(2));
        assert_eq!(next_after(&trig, 0), Some(0));
        assert_eq!(next_after(&trig, 20), None);
    }
}
