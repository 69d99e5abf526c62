//! Motor-level helpers built on the ramp conversions.
//!
//! These work in microsteps per second of the motor shaft and take the motor
//! step angle and gearing from the context.

use crate::error::{ConversionError, Result};

use super::ramp::{constrain, UnitConverter, MAX_TSTEP, MAX_VMAX, TWO_POW_24};

/// Largest value the AMAX register holds.
pub const MAX_AMAX: u32 = (1 << 16) - 1;

/// 2^41, the acceleration time base of the datasheet relation
/// `a = AMAX × f_clk² / 2^41`.
const TWO_POW_41: f64 = 2_199_023_255_552.0;

impl UnitConverter {
    /// Microsteps per output revolution (full steps × microsteps × gearing).
    pub fn microsteps_per_revolution(&self) -> u32 {
        let ctx = self.context();
        let steps = ctx.step_angle.full_steps_per_revolution() as f32
            * ctx.microsteps.value() as f32
            * ctx.gear_ratio;
        libm::roundf(steps) as u32
    }

    /// Ramp generator time reference, `2^24 / f_clk[MHz]`.
    pub fn t_ref(&self) -> u32 {
        let mhz = (self.context().clock_hz / 1_000_000).max(1);
        (1u32 << 24) / mhz
    }

    /// Output revolutions per minute → microsteps per second.
    pub fn rpm_to_microsteps_per_sec(&self, rpm: f32) -> f32 {
        rpm / 60.0 * self.microsteps_per_revolution() as f32
    }

    /// Microsteps per second → VMAX, truncated toward zero.
    ///
    /// Use this to report the register value a known velocity is running at.
    pub fn velocity_to_vmax(&self, microsteps_per_sec: f32) -> u32 {
        self.scale_velocity(microsteps_per_sec, libm::trunc)
    }

    /// Requested microsteps per second → VMAX, rounded to nearest.
    ///
    /// Use this when programming a target velocity.
    pub fn desired_velocity_to_vmax(&self, microsteps_per_sec: f32) -> u32 {
        self.scale_velocity(microsteps_per_sec, libm::round)
    }

    fn scale_velocity(&self, microsteps_per_sec: f32, round: fn(f64) -> f64) -> u32 {
        if microsteps_per_sec.is_nan() || microsteps_per_sec <= 0.0 {
            return 0;
        }
        let vmax = round(microsteps_per_sec as f64 * TWO_POW_24 / self.context().clock());
        constrain(vmax, 0.0, MAX_VMAX as f64) as u32
    }

    /// AMAX for reaching `velocity` (microsteps/s) from standstill in
    /// `ramp_time_s` seconds, truncated and clamped to the 16-bit register.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::InvalidRampTime` unless the ramp time is a
    /// positive finite number, and `ConversionError::NotFinite` for a NaN or
    /// infinite velocity.
    pub fn accel_to_amax(&self, ramp_time_s: f32, velocity: f32) -> Result<u32> {
        if !ramp_time_s.is_finite() || ramp_time_s <= 0.0 {
            return Err(ConversionError::InvalidRampTime.into());
        }
        if !velocity.is_finite() {
            return Err(ConversionError::NotFinite.into());
        }
        let clock = self.context().clock();
        let accel = velocity.abs() as f64 / ramp_time_s as f64;
        let amax = libm::trunc(accel * TWO_POW_41 / (clock * clock));
        Ok(constrain(amax, 0.0, MAX_AMAX as f64) as u32)
    }

    /// VMAX-style threshold velocity → TSTEP, rounded to nearest and clamped
    /// to 20 bits.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::ZeroThreshold` for a zero velocity.
    pub fn vmax_to_tstep(&self, vmax: u32) -> Result<u32> {
        if vmax == 0 {
            return Err(ConversionError::ZeroThreshold.into());
        }
        let microsteps = self.context().microsteps.value() as f64;
        let tstep = libm::round(TWO_POW_24 / vmax as f64 * microsteps / 256.0);
        Ok(constrain(tstep, 0.0, MAX_TSTEP as f64) as u32)
    }
}
