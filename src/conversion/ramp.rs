//! Ramp-generator unit conversion.
//!
//! The chip clocks its ramp generator from `f_clk` and stores velocities in
//! units of `f_clk / 2^24` microsteps per second. All scaling here is taken
//! from the [`ConversionContext`], never from crate-level constants, so one
//! process can convert for several differently clocked chips.

use crate::config::ConversionContext;
use crate::error::{ConversionError, Result};

/// Largest internal velocity `speed_to_hz` accepts.
pub const SPEED_TO_HZ_LIMIT: u32 = 715_828;

/// Largest value the VMAX register holds (2^23 - 512).
pub const MAX_VMAX: u32 = 8_388_096;

/// Largest value of a 20-bit TSTEP-style threshold register.
pub const MAX_TSTEP: u32 = (1 << 20) - 1;

/// 2^24, the velocity time base of the ramp generator.
pub(crate) const TWO_POW_24: f64 = 16_777_216.0;

/// 512 × 256 × 2^24, the acceleration time base.
pub(crate) const ACCEL_TIME_BASE: f64 = 512.0 * 256.0 * TWO_POW_24;

/// Clamp `value` to `[min, max]`.
#[inline]
pub fn constrain<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Stateless conversion engine bound to one immutable context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    ctx: ConversionContext,
}

impl UnitConverter {
    /// Create a converter after validating the context.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero clock or invalid gearing.
    pub fn new(ctx: ConversionContext) -> Result<Self> {
        ctx.validate()?;
        Ok(Self { ctx })
    }

    /// The context every conversion is scaled by.
    #[inline]
    pub fn context(&self) -> &ConversionContext {
        &self.ctx
    }

    /// Internal velocity → microsteps per second.
    ///
    /// `Hz = internal × f_clk / 2^24`. Values above [`SPEED_TO_HZ_LIMIT`]
    /// are outside what the chip represents and map to `0.0`.
    pub fn speed_to_hz(&self, internal: u32) -> f32 {
        if internal > SPEED_TO_HZ_LIMIT {
            debug!("speed {} out of range, mapped to 0 Hz", internal);
            return 0.0;
        }
        (internal as f64 * self.ctx.clock() / TWO_POW_24) as f32
    }

    /// Microsteps per second → internal velocity.
    ///
    /// Inverse of [`speed_to_hz`](Self::speed_to_hz) with a `+1` rounding
    /// bias. Negative and NaN input clamps to `0`; the result saturates at
    /// [`MAX_VMAX`].
    pub fn speed_from_hz(&self, hz: f32) -> u32 {
        if hz.is_nan() || hz < 0.0 {
            return 0;
        }
        let internal = libm::trunc(hz as f64 * TWO_POW_24 / self.ctx.clock() + 1.0);
        constrain(internal, 0.0, MAX_VMAX as f64) as u32
    }

    /// Acceleration in microsteps/s² → internal AMAX units.
    ///
    /// Scales by `f_clk² / (512 × 256 × 2^24)` times the microstep count and
    /// truncates toward zero. The sign of the input is preserved since
    /// acceleration is a signed quantity; NaN maps to `0`.
    pub fn accel_from_hz(&self, hz_per_sec: f32) -> i32 {
        if hz_per_sec.is_nan() || hz_per_sec == 0.0 {
            return 0;
        }
        let clock = self.ctx.clock();
        let scale = clock * clock / ACCEL_TIME_BASE * self.ctx.microsteps.value() as f64;
        let amax = libm::trunc(hz_per_sec as f64 * scale);
        constrain(amax, i32::MIN as f64, i32::MAX as f64) as i32
    }

    /// Threshold speed in Hz → TSTEP threshold value.
    ///
    /// `TSTEP = (2^24 / threshold) × (microsteps / 256)`, clamped to the
    /// 20-bit register range.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::ZeroThreshold` for a threshold of `0`.
    pub fn threshold_speed_to_tstep(&self, threshold_hz: u32) -> Result<u32> {
        if threshold_hz == 0 {
            warn!("zero threshold speed rejected");
            return Err(ConversionError::ZeroThreshold.into());
        }
        let periods = (1u64 << 24) / threshold_hz as u64;
        let tstep = periods * self.ctx.microsteps.value() as u64 / 256;
        Ok(constrain(tstep, 0, MAX_TSTEP as u64) as u32)
    }
}
