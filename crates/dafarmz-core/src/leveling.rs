//! XP and level conversion.
//!
//! `level = floor(k * sqrt(xp))`. The inverse returns the smallest XP that
//! reaches a level, so `level_from_xp(xp_from_level(l)) == l` holds exactly.

use tracing::warn;

use crate::config::LevelingConfig;

/// Curve constant used when the configured one is unusable.
pub const DEFAULT_K: f64 = 0.07;

/// The XP curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leveling {
    k: f64,
}

impl Default for Leveling {
    fn default() -> Self {
        Self { k: DEFAULT_K }
    }
}

impl Leveling {
    /// A curve with constant `k`. Non-positive or non-finite values fall
    /// back to [`DEFAULT_K`] with a warning.
    pub fn new(k: f64) -> Self {
        if k.is_finite() && k > 0.0 {
            Self { k }
        } else {
            warn!(k, fallback = DEFAULT_K, "unusable leveling constant");
            Self::default()
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &LevelingConfig) -> Self {
        Self::new(config.k)
    }

    /// Level reached with `xp` experience.
    pub fn level_from_xp(&self, xp: u64) -> u32 {
        // XP counters stay far below 2^53, and the float-to-int cast saturates.
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let level = (self.k * (xp as f64).sqrt()).floor() as u32;
        level
    }

    /// Smallest XP whose level is at least `level`.
    pub fn xp_from_level(&self, level: u32) -> u64 {
        if level == 0 {
            return 0;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let estimate = (f64::from(level) / self.k).powi(2).ceil() as u64;

        // The float estimate can land a step either side of the boundary.
        let mut xp = estimate;
        while xp > 0 && self.level_from_xp(xp.saturating_sub(1)) >= level {
            xp = xp.saturating_sub(1);
        }
        while self.level_from_xp(xp) < level && xp < u64::MAX {
            xp = xp.saturating_add(1);
        }
        xp
    }

    /// XP needed to reach the level after the one `xp` is at.
    pub fn next_level_xp(&self, xp: u64) -> u64 {
        self.xp_from_level(self.level_from_xp(xp).saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_levels() {
        let curve = Leveling::default();
        assert_eq!(curve.level_from_xp(0), 0);
        assert_eq!(curve.level_from_xp(204), 0);
        assert_eq!(curve.level_from_xp(205), 1);
        assert_eq!(curve.xp_from_level(0), 0);
        assert_eq!(curve.xp_from_level(1), 205);
        assert_eq!(curve.xp_from_level(10), 20_409);
    }

    #[test]
    fn round_trip_is_exact_at_every_level() {
        let curve = Leveling::default();
        for level in 0..=500 {
            let xp = curve.xp_from_level(level);
            assert_eq!(curve.level_from_xp(xp), level, "level {level}");
            if xp > 0 {
                assert!(curve.level_from_xp(xp - 1) < level, "xp {xp} is minimal");
            }
        }
    }

    #[test]
    fn round_trip_is_stable_for_any_xp() {
        let curve = Leveling::default();
        for xp in (0..2_000_000_u64).step_by(37) {
            let level = curve.level_from_xp(xp);
            assert_eq!(curve.level_from_xp(curve.xp_from_level(level)), level);
        }
    }

    #[test]
    fn next_level_xp_is_the_next_boundary() {
        let curve = Leveling::default();
        assert_eq!(curve.next_level_xp(0), 205);
        assert_eq!(curve.next_level_xp(204), 205);
        assert_eq!(curve.next_level_xp(205), curve.xp_from_level(2));
    }

    #[test]
    fn bad_constant_falls_back() {
        assert_eq!(Leveling::new(0.0), Leveling::default());
        assert_eq!(Leveling::new(f64::NAN), Leveling::default());
        assert_eq!(Leveling::new(-1.0), Leveling::default());
        let custom = Leveling::new(0.5);
        assert_eq!(custom.level_from_xp(16), 2);
    }
}
