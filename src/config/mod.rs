//! Configuration module for tmc-comm.
//!
//! Provides the conversion context and bus settings, loadable from TOML
//! files (with `std` feature) or built in code.

mod bus;
mod context;
mod system;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use bus::{
    BitOrder, Parity, SpiSettings, UartSettings, DEFAULT_SPI_FREQUENCY_HZ,
    DEFAULT_SPI_MAX_FREQUENCY_HZ, UART_BAUD_RATE, UART_TIMEOUT_MS,
};
pub use context::{ConversionContext, DEFAULT_CLOCK_HZ};
pub use system::ChipConfig;
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Microsteps, StepAngle};
