//! TOML configuration parsing and validation.

use tmc_comm::config::{BitOrder, ChipConfig, Parity, UART_BAUD_RATE};
use tmc_comm::error::ConfigError;
use tmc_comm::{parse_config, validate_config, Error, Microsteps, StepAngle};

#[test]
fn test_empty_document_uses_reference_values() {
    let config = parse_config("").unwrap();
    assert_eq!(config, ChipConfig::default());
    assert_eq!(config.conversion.clock_hz, 12_000_000);
    assert_eq!(config.conversion.microsteps, Microsteps::TWO_FIFTY_SIXTH);
    assert_eq!(config.spi.mode, 3);
    assert_eq!(config.spi.bit_order, BitOrder::MsbFirst);
    assert_eq!(config.uart.baud_rate, UART_BAUD_RATE);
    assert_eq!(config.uart.parity, Parity::None);
}

#[test]
fn test_geared_motor_context() {
    let config = parse_config(
        r#"
[conversion]
clock_hz = 16000000
microsteps = 32
step_angle_deg = 0.9
gear_ratio = 5.0
"#,
    )
    .unwrap();

    assert_eq!(config.conversion.clock_hz, 16_000_000);
    assert_eq!(config.conversion.microsteps, Microsteps::THIRTY_SECOND);
    assert_eq!(config.conversion.step_angle, StepAngle::DEG_0_9);
    assert_eq!(config.conversion.gear_ratio, 5.0);
}

#[test]
fn test_single_wire_uart() {
    let config = parse_config(
        r#"
[uart]
single_wire = true
poll_interval_us = 50
"#,
    )
    .unwrap();
    assert!(config.uart.single_wire);
    assert_eq!(config.uart.poll_interval_us, 50);
}

#[test]
fn test_invalid_microsteps_fail_to_parse() {
    let result = parse_config("[conversion]\nmicrosteps = 3\n");
    assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
}

#[test]
fn test_zero_clock_fails_validation() {
    let result = parse_config("[conversion]\nclock_hz = 0\n");
    assert_eq!(result, Err(Error::Config(ConfigError::InvalidClock(0))));
}

#[test]
fn test_spi_mode_zero_is_rejected() {
    let result = parse_config("[spi]\nmode = 0\n");
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::RejectedBusSettings(_)))
    ));
}

#[test]
fn test_spi_clock_above_ceiling_is_rejected() {
    let result = parse_config("[spi]\nfrequency_hz = 20000000\n");
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::RejectedBusSettings(_)))
    ));

    let config = parse_config("[spi]\nfrequency_hz = 20000000\nmax_frequency_hz = 25000000\n").unwrap();
    assert_eq!(config.spi.max_frequency_hz, 25_000_000);
}

#[test]
fn test_lsb_first_is_rejected() {
    let result = parse_config("[spi]\nbit_order = \"lsb_first\"\n");
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::RejectedBusSettings(_)))
    ));
}

#[test]
fn test_validate_config_in_code() {
    let mut config = ChipConfig::default();
    assert!(validate_config(&config).is_ok());

    config.uart.stop_bits = 2;
    assert!(validate_config(&config).is_err());
}
