//! Configuration validation.

use crate::error::Result;

use super::ChipConfig;

/// Validate a chip configuration.
///
/// Checks:
/// - Clock frequency is non-zero and the gear ratio is positive
/// - SPI settings are mode 3, MSB first, non-zero clock
/// - UART settings are 115200 baud 8N1
pub fn validate_config(config: &ChipConfig) -> Result<()> {
    config.conversion.validate()?;
    config.spi.validate()?;
    config.uart.validate()?;
    Ok(())
}
