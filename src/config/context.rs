//! Conversion context: the clocking and motor parameters every unit
//! conversion is scaled by.

use serde::Deserialize;

use crate::error::ConfigError;

use super::units::{Microsteps, StepAngle};

/// Reference chip clock (internal oscillator), in Hz.
pub const DEFAULT_CLOCK_HZ: u32 = 12_000_000;

/// Immutable scaling parameters for one chip and the motor attached to it.
///
/// Owned by the caller. Two chips with different clocking simply use two
/// contexts.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConversionContext {
    /// Chip clock frequency in Hz.
    #[serde(default = "default_clock_hz")]
    pub clock_hz: u32,

    /// Microstep resolution configured on the chip.
    #[serde(default)]
    pub microsteps: Microsteps,

    /// Motor full-step angle.
    #[serde(default, rename = "step_angle_deg")]
    pub step_angle: StepAngle,

    /// Gear ratio (output:input, e.g., 5.0 means 5:1 reduction).
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f32,
}

fn default_clock_hz() -> u32 {
    DEFAULT_CLOCK_HZ
}

fn default_gear_ratio() -> f32 {
    1.0
}

impl Default for ConversionContext {
    fn default() -> Self {
        Self {
            clock_hz: DEFAULT_CLOCK_HZ,
            microsteps: Microsteps::default(),
            step_angle: StepAngle::default(),
            gear_ratio: 1.0,
        }
    }
}

impl ConversionContext {
    /// Create a context with a 1.8° motor and no gearing.
    pub const fn new(clock_hz: u32, microsteps: Microsteps) -> Self {
        Self {
            clock_hz,
            microsteps,
            step_angle: StepAngle::DEG_1_8,
            gear_ratio: 1.0,
        }
    }

    /// Set the motor full-step angle.
    pub fn with_step_angle(mut self, step_angle: StepAngle) -> Self {
        self.step_angle = step_angle;
        self
    }

    /// Set the gear ratio.
    pub fn with_gear_ratio(mut self, gear_ratio: f32) -> Self {
        self.gear_ratio = gear_ratio;
        self
    }

    /// Clock frequency as a float, in Hz.
    #[inline]
    pub fn clock(&self) -> f64 {
        self.clock_hz as f64
    }

    /// Check the fields that the type system does not.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero clock or a non-positive gear ratio.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_hz == 0 {
            return Err(ConfigError::InvalidClock(self.clock_hz));
        }
        if !self.gear_ratio.is_finite() || self.gear_ratio <= 0.0 {
            return Err(ConfigError::InvalidGearRatio(self.gear_ratio));
        }
        Ok(())
    }
}
