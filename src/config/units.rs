//! Validated microstep resolution and motor step angle.

use serde::Deserialize;

use crate::error::ConfigError;

/// Microstep resolution: microsteps per full step, a power of two up to 256.
///
/// The chip stores this as the 4-bit MRES field, `8 - log2(microsteps)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u16")]
pub struct Microsteps(u16);

impl Microsteps {
    /// Full step (no microstepping).
    pub const FULL: Self = Self(1);
    /// Half step.
    pub const HALF: Self = Self(2);
    /// Quarter step.
    pub const QUARTER: Self = Self(4);
    /// Eighth step.
    pub const EIGHTH: Self = Self(8);
    /// Sixteenth step.
    pub const SIXTEENTH: Self = Self(16);
    /// Thirty-second step.
    pub const THIRTY_SECOND: Self = Self(32);
    /// Sixty-fourth step.
    pub const SIXTY_FOURTH: Self = Self(64);
    /// 128th step.
    pub const ONE_TWENTY_EIGHTH: Self = Self(128);
    /// 256th step (native resolution of the ramp generator).
    pub const TWO_FIFTY_SIXTH: Self = Self(256);

    /// Validate a microstep count.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMicrosteps` unless `value` is a power of
    /// two no larger than 256.
    pub fn new(value: u16) -> Result<Self, ConfigError> {
        if value.is_power_of_two() && value <= 256 {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidMicrosteps(value))
        }
    }

    /// Decode the MRES register field. Values above 8 are read as full step.
    pub const fn from_mres(mres: u8) -> Self {
        let shift = if mres > 8 { 0 } else { 8 - mres };
        Self(1 << shift)
    }

    /// Microsteps per full step.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// MRES register field for this resolution.
    #[inline]
    pub const fn mres(self) -> u8 {
        8 - self.0.trailing_zeros() as u8
    }
}

impl Default for Microsteps {
    fn default() -> Self {
        Self::TWO_FIFTY_SIXTH
    }
}

impl TryFrom<u16> for Microsteps {
    type Error = ConfigError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Motor full-step angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize)]
#[serde(try_from = "f32")]
pub struct StepAngle(f32);

impl StepAngle {
    /// 1.8° (200 steps per revolution).
    pub const DEG_1_8: Self = Self(1.8);
    /// 0.9° (400 steps per revolution).
    pub const DEG_0_9: Self = Self(0.9);
    /// 0.72° (500 steps per revolution).
    pub const DEG_0_72: Self = Self(0.72);
    /// 1.2° (300 steps per revolution).
    pub const DEG_1_2: Self = Self(1.2);
    /// 0.48° (750 steps per revolution).
    pub const DEG_0_48: Self = Self(0.48);

    /// Create a step angle with validation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidStepAngle` unless `0 < degrees < 360`.
    pub fn new(degrees: f32) -> Result<Self, ConfigError> {
        if degrees > 0.0 && degrees < 360.0 {
            Ok(Self(degrees))
        } else {
            Err(ConfigError::InvalidStepAngle(degrees))
        }
    }

    /// Get the angle in degrees.
    #[inline]
    pub const fn degrees(self) -> f32 {
        self.0
    }

    /// Full steps per motor revolution, rounded to the nearest integer.
    #[inline]
    pub fn full_steps_per_revolution(self) -> u32 {
        libm::roundf(360.0 / self.0) as u32
    }
}

impl Default for StepAngle {
    fn default() -> Self {
        Self::DEG_1_8
    }
}

impl TryFrom<f32> for StepAngle {
    type Error = ConfigError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microsteps_accepts_powers_of_two() {
        for shift in 0..=8 {
            assert_eq!(Microsteps::new(1 << shift).unwrap().value(), 1 << shift);
        }
        assert!(Microsteps::new(0).is_err());
        assert!(Microsteps::new(3).is_err());
        assert!(Microsteps::new(17).is_err());
        assert!(Microsteps::new(512).is_err());
    }

    #[test]
    fn test_microsteps_mres_encoding() {
        assert_eq!(Microsteps::TWO_FIFTY_SIXTH.mres(), 0);
        assert_eq!(Microsteps::SIXTEENTH.mres(), 4);
        assert_eq!(Microsteps::FULL.mres(), 8);
        for shift in 0..=8u8 {
            let m = Microsteps::from_mres(shift);
            assert_eq!(m.mres(), shift);
        }
        assert_eq!(Microsteps::from_mres(15), Microsteps::FULL);
    }

    #[test]
    fn test_step_angle_full_steps() {
        assert_eq!(StepAngle::DEG_1_8.full_steps_per_revolution(), 200);
        assert_eq!(StepAngle::DEG_0_9.full_steps_per_revolution(), 400);
        assert_eq!(StepAngle::DEG_0_72.full_steps_per_revolution(), 500);
    }

    #[test]
    fn test_step_angle_rejects_out_of_range() {
        assert!(StepAngle::new(0.0).is_err());
        assert!(StepAngle::new(-1.8).is_err());
        assert!(StepAngle::new(360.0).is_err());
    }
}
