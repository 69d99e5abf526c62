//! # tmc-comm
//!
//! Register communication core for TMC5160-class stepper motor drivers, with
//! embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **SPI transport**: 5-byte datagrams, several chips on one bus, each on its own select line
//! - **UART transport**: checksummed packets with a fixed 100 ms bound per access
//! - **Driver facade**: one chip, one transport, uniform register read/write
//! - **Unit conversion**: velocity, acceleration and TSTEP threshold in chip units
//! - **no_std compatible**: Core library works without standard library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tmc_comm::{
//!     ConversionContext, DeviceAddress, Driver, Microsteps, RegisterAddress, SpiSettings,
//!     SpiTransport, UnitConverter,
//! };
//!
//! let spi = SpiTransport::single(bus, DeviceAddress(0), cs, SpiSettings::default())?;
//! let mut driver = Driver::new(spi, DeviceAddress(0));
//! driver.setup()?;
//!
//! let conv = UnitConverter::new(ConversionContext::new(12_000_000, Microsteps::TWO_FIFTY_SIXTH))?;
//! driver.write_register(RegisterAddress::VMAX, conv.speed_from_hz(1000.0))?;
//!
//! // SPI answers with the data of the previous access: read twice.
//! driver.read_register(RegisterAddress::TSTEP)?;
//! let tstep = driver.read_register(RegisterAddress::TSTEP)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `defmt`: Enables defmt logging for embedded targets

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

// Core modules
pub mod config;
pub mod conversion;
pub mod driver;
pub mod error;
pub mod transport;

// Re-exports for ergonomic API
pub use config::{validate_config, ChipConfig, ConversionContext, SpiSettings, UartSettings};
pub use conversion::UnitConverter;
pub use driver::Driver;
pub use error::{Error, Result};
pub use transport::{
    DeviceAddress, RegisterAddress, RegisterComm, SpiTransport, UartPhase, UartTransport,
};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Microsteps, StepAngle};
