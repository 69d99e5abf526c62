//! Unit conversion engine.
//!
//! Translates velocities, accelerations and threshold speeds between
//! real-world units and the chip's fixed-point ramp registers. No I/O.

mod motor;
mod ramp;

pub use motor::MAX_AMAX;
pub use ramp::{constrain, UnitConverter, MAX_TSTEP, MAX_VMAX, SPEED_TO_HZ_LIMIT};
