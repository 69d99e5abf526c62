//! Bus settings for the SPI and UART transports.
//!
//! The HAL applies clock rate and framing when the peripheral is constructed;
//! these settings record what the transport requires and are checked by
//! `setup()` before any register is touched.

use core::fmt::Write;

use embedded_hal::spi::{Mode, MODE_0, MODE_1, MODE_2, MODE_3};
use serde::Deserialize;

use crate::error::ConfigError;

/// Reference SPI clock rate, in Hz.
pub const DEFAULT_SPI_FREQUENCY_HZ: u32 = 12_000_000;

/// Default ceiling on the SPI clock rate, in Hz.
pub const DEFAULT_SPI_MAX_FREQUENCY_HZ: u32 = DEFAULT_SPI_FREQUENCY_HZ;

/// The only baud rate the UART transport runs at.
pub const UART_BAUD_RATE: u32 = 115_200;

/// Bound on every UART register access, in milliseconds.
pub const UART_TIMEOUT_MS: u32 = 100;

/// Bit order on the SPI bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    /// Most significant bit first.
    #[default]
    MsbFirst,
    /// Least significant bit first.
    LsbFirst,
}

/// SPI bus settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SpiSettings {
    /// SPI mode number (0-3).
    #[serde(default = "default_spi_mode")]
    pub mode: u8,

    /// Bit order.
    #[serde(default)]
    pub bit_order: BitOrder,

    /// Clock rate in Hz.
    #[serde(default = "default_spi_frequency")]
    pub frequency_hz: u32,

    /// Highest clock rate accepted by `validate()`, in Hz.
    #[serde(default = "default_spi_max_frequency")]
    pub max_frequency_hz: u32,
}

fn default_spi_mode() -> u8 {
    3
}

fn default_spi_frequency() -> u32 {
    DEFAULT_SPI_FREQUENCY_HZ
}

fn default_spi_max_frequency() -> u32 {
    DEFAULT_SPI_MAX_FREQUENCY_HZ
}

impl Default for SpiSettings {
    fn default() -> Self {
        Self {
            mode: 3,
            bit_order: BitOrder::MsbFirst,
            frequency_hz: DEFAULT_SPI_FREQUENCY_HZ,
            max_frequency_hz: DEFAULT_SPI_MAX_FREQUENCY_HZ,
        }
    }
}

impl SpiSettings {
    /// Clock polarity/phase as an embedded-hal [`Mode`].
    pub fn hal_mode(&self) -> Option<Mode> {
        match self.mode {
            0 => Some(MODE_0),
            1 => Some(MODE_1),
            2 => Some(MODE_2),
            3 => Some(MODE_3),
            _ => None,
        }
    }

    /// Check that the chip can talk on a bus configured this way.
    ///
    /// The chip samples on the rising edge with an idle-high clock (mode 3),
    /// most significant bit first, at a clock rate between 1 Hz and
    /// `max_frequency_hz`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::RejectedBusSettings` describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hal_mode() != Some(MODE_3) {
            return Err(rejected(format_args!("SPI mode {} (need 3)", self.mode)));
        }
        if self.bit_order != BitOrder::MsbFirst {
            return Err(rejected(format_args!("LSB-first bit order")));
        }
        if self.frequency_hz == 0 {
            return Err(rejected(format_args!("SPI clock of 0 Hz")));
        }
        if self.frequency_hz > self.max_frequency_hz {
            return Err(rejected(format_args!(
                "SPI clock {} Hz above {} Hz",
                self.frequency_hz,
                self.max_frequency_hz
            )));
        }
        Ok(())
    }
}

/// Parity setting of the UART line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

/// UART line settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UartSettings {
    /// Baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Data bits per character.
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// Parity.
    #[serde(default)]
    pub parity: Parity,

    /// Stop bits.
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    /// Interval between two polls of the line while waiting, in microseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_us: u32,

    /// TX and RX are tied together, so every sent byte is read back once.
    #[serde(default)]
    pub single_wire: bool,
}

fn default_baud_rate() -> u32 {
    UART_BAUD_RATE
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_poll_interval() -> u32 {
    20
}

impl Default for UartSettings {
    fn default() -> Self {
        Self {
            baud_rate: UART_BAUD_RATE,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            poll_interval_us: default_poll_interval(),
            single_wire: false,
        }
    }
}

impl UartSettings {
    /// Check for 115200 baud, 8N1 framing and a usable poll interval.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::RejectedBusSettings` describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate != UART_BAUD_RATE {
            return Err(rejected(format_args!("baud rate {} (need {})", self.baud_rate, UART_BAUD_RATE)));
        }
        if self.data_bits != 8 || self.parity != Parity::None || self.stop_bits != 1 {
            return Err(rejected(format_args!("framing is not 8N1")));
        }
        if self.poll_interval_us == 0 || self.poll_interval_us >= UART_TIMEOUT_MS * 1000 {
            return Err(rejected(format_args!("poll interval {} us", self.poll_interval_us)));
        }
        Ok(())
    }
}

fn rejected(args: core::fmt::Arguments<'_>) -> ConfigError {
    let mut msg = heapless::String::<64>::new();
    let _ = msg.write_fmt(args);
    ConfigError::RejectedBusSettings(msg)
}
