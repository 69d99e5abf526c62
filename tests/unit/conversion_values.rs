//! Reference values of the conversion engine.

use tmc_comm::conversion::{MAX_TSTEP, SPEED_TO_HZ_LIMIT};
use tmc_comm::error::ConversionError;
use tmc_comm::{ConversionContext, Error, Microsteps, UnitConverter};

fn converter(clock_hz: u32, microsteps: Microsteps) -> UnitConverter {
    UnitConverter::new(ConversionContext::new(clock_hz, microsteps)).unwrap()
}

#[test]
fn test_tstep_reference_points() {
    let conv = converter(12_000_000, Microsteps::TWO_FIFTY_SIXTH);
    assert_eq!(conv.threshold_speed_to_tstep(1000), Ok(16777));
    assert_eq!(conv.threshold_speed_to_tstep(10000), Ok(1677));
    assert_eq!(conv.threshold_speed_to_tstep(1), Ok(MAX_TSTEP));
    assert_eq!(
        conv.threshold_speed_to_tstep(0),
        Err(Error::Conversion(ConversionError::ZeroThreshold))
    );
}

#[test]
fn test_speed_limit_boundary() {
    let conv = converter(12_000_000, Microsteps::TWO_FIFTY_SIXTH);
    assert!(conv.speed_to_hz(SPEED_TO_HZ_LIMIT) > 500_000.0);
    assert_eq!(conv.speed_to_hz(SPEED_TO_HZ_LIMIT + 1), 0.0);
}

#[test]
fn test_speed_from_hz_bias() {
    let conv = converter(12_000_000, Microsteps::TWO_FIFTY_SIXTH);
    // 1000 Hz is 1398.1 internal units, biased up by one
    assert_eq!(conv.speed_from_hz(1000.0), 1399);
    assert_eq!(conv.speed_from_hz(-1000.0), 0);
}

#[test]
fn test_accel_depends_on_microsteps() {
    let fine = converter(12_000_000, Microsteps::TWO_FIFTY_SIXTH);
    let coarse = converter(12_000_000, Microsteps::SIXTEENTH);
    assert_eq!(fine.accel_from_hz(1.0), 16763);
    assert_eq!(coarse.accel_from_hz(1.0), 1047);
    assert_eq!(coarse.accel_from_hz(-1.0), -1047);
}

#[test]
fn test_motor_helpers_at_sixteen_microsteps() {
    let conv = converter(12_000_000, Microsteps::SIXTEENTH);
    assert_eq!(conv.microsteps_per_revolution(), 3200);
    assert_eq!(conv.velocity_to_vmax(1000.0), 1398);
    assert_eq!(conv.desired_velocity_to_vmax(51200.0), 71583);
    assert_eq!(conv.accel_to_amax(1.5, 51200.0), Ok(521));
    assert_eq!(conv.vmax_to_tstep(5145), Ok(204));
}

#[test]
fn test_one_rpm_at_sixteen_microsteps() {
    let conv = converter(12_000_000, Microsteps::SIXTEENTH);
    let sps = conv.rpm_to_microsteps_per_sec(1.0);
    assert!((sps - 3200.0 / 60.0).abs() < 1e-3);
}
