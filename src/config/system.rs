//! Chip configuration - root configuration structure.

use serde::Deserialize;

use super::bus::{SpiSettings, UartSettings};
use super::context::ConversionContext;

/// Root configuration structure from TOML.
///
/// Every table is optional; a missing table takes the reference values
/// (12 MHz clock, 256 microsteps, SPI mode 3 at 12 MHz, UART 115200 8N1).
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct ChipConfig {
    /// Unit conversion parameters.
    #[serde(default)]
    pub conversion: ConversionContext,

    /// SPI transport settings.
    #[serde(default)]
    pub spi: SpiSettings,

    /// UART transport settings.
    #[serde(default)]
    pub uart: UartSettings,
}
