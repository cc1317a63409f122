//! Magnitude to bounded visual loudness

/// Linear magnitude in dB (20·log10)
///
/// Zero, negative and NaN magnitudes map to negative infinity.
#[inline]
pub fn magnitude_to_db(magnitude: f32) -> f32 {
    if magnitude > 0.0 {
        20.0 * magnitude.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Maps magnitudes onto [0, 1] through a dB window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessScale {
    min_db: f32,
    max_db: f32,
}

impl LoudnessScale {
    /// Caller guarantees `min_db < max_db`; the configuration layer validates this.
    pub fn new(min_db: f32, max_db: f32) -> Self {
        Self { min_db, max_db }
    }

    /// dB span mapped onto [0, 1]
    pub fn headroom(&self) -> f32 {
        self.max_db - self.min_db
    }

    /// Normalized loudness of `magnitude`, always within [0, 1]
    ///
    /// The dB value is lifted by `|min_db|`, floored at 0 and divided by the
    /// headroom. For a negative floor this maps `min_db` to 0 and `max_db`
    /// to 1.
    ///
    /// # Arguments
    /// * `magnitude` - Linear bin or band magnitude
    ///
    /// # Returns
    /// Loudness clamped to [0, 1]
    #[inline]
    pub fn normalize(&self, magnitude: f32) -> f32 {
        let shifted = (magnitude_to_db(magnitude) + self.min_db.abs()).max(0.0);
        (shifted / self.headroom()).min(1.0)
    }

    /// Normalize a slice in place
    pub fn normalize_inplace(&self, values: &mut [f32]) {
        for v in values.iter_mut() {
            *v = self.normalize(*v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> LoudnessScale {
        LoudnessScale::new(-28.0, 64.0)
    }

    #[test]
    fn test_db_conversion() {
        assert!((magnitude_to_db(1.0)).abs() < 1e-6);
        assert!((magnitude_to_db(10.0) - 20.0).abs() < 1e-5);
        assert!((magnitude_to_db(0.1) + 20.0).abs() < 1e-5);
        assert_eq!(magnitude_to_db(0.0), f32::NEG_INFINITY);
        assert_eq!(magnitude_to_db(-3.0), f32::NEG_INFINITY);
        assert_eq!(magnitude_to_db(f32::NAN), f32::NEG_INFINITY);
    }

    #[test]
    fn test_normalize_endpoints() {
        let s = scale();
        assert_eq!(s.headroom(), 92.0);

        // min_db -> 0, max_db -> 1
        let at_min = 10f32.powf(-28.0 / 20.0);
        let at_max = 10f32.powf(64.0 / 20.0);
        assert!(s.normalize(at_min).abs() < 1e-4);
        assert!((s.normalize(at_max) - 1.0).abs() < 1e-4);

        // Unity magnitude sits 28 dB above the floor
        assert!((s.normalize(1.0) - 28.0 / 92.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_clamps() {
        let s = scale();
        assert_eq!(s.normalize(0.0), 0.0);
        assert_eq!(s.normalize(-1.0), 0.0);
        assert_eq!(s.normalize(f32::NAN), 0.0);
        assert_eq!(s.normalize(1e-9), 0.0);
        assert_eq!(s.normalize(1e9), 1.0);
        assert_eq!(s.normalize(f32::INFINITY), 1.0);
    }

    #[test]
    fn test_positive_floor_lifts_by_magnitude() {
        // The floor shift uses |min_db|, so a positive floor lifts too
        let s = LoudnessScale::new(10.0, 30.0);
        assert!((s.normalize(1.0) - 0.5).abs() < 1e-5);
        assert!((s.normalize(10f32.sqrt()) - 1.0).abs() < 1e-5);
        assert_eq!(s.normalize(0.1), 0.0);
    }

    #[test]
    fn test_normalize_inplace_is_monotonic() {
        let s = scale();
        let mut values: Vec<f32> = (0..50).map(|i| i as f32 * 3.7).collect();
        s.normalize_inplace(&mut values);

        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
