//! Occurrence velocity: a raw count normalized by the window length.

/// Returns `count / window`, using a window of 1 when `window` is zero.
pub fn velocity(count: i64, window: u32) -> f64 {
    let effective = if window == 0 { 1 } else { window };
    count as f64 / effective as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_window_uses_one() {
        assert_eq!(velocity(10, 0), 10.0);
    }

    #[test]
    fn divides_by_window() {
        assert_eq!(velocity(10, 5), 2.0);
        assert_eq!(velocity(3, 2), 1.5);
    }

    #[test]
    fn zero_count_is_zero() {
        assert_eq!(velocity(0, 24), 0.0);
    }
}
