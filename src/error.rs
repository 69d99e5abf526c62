//! Error types for tmc-comm.
//!
//! Provides unified error handling across configuration, register transports,
//! and unit conversion.

use core::fmt;

use embedded_hal::digital;
use embedded_hal::spi;
use embedded_hal_nb::serial;

use crate::transport::DeviceAddress;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all tmc-comm operations.
///
/// Every error is terminal for the single register access that raised it.
/// Nothing is retried internally.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Uninitialized, unbound or rejected configuration
    Config(ConfigError),
    /// Device address is not bound to a select line (SPI only)
    UnknownDevice(DeviceAddress),
    /// Low-level bus or pin fault
    Transport(TransportError),
    /// UART operation exceeded its time bound
    Timeout {
        /// Bytes received before the bound expired
        received: usize,
        /// Bound that was exceeded, in milliseconds
        timeout_ms: u32,
    },
    /// UART response failed its integrity check
    Checksum {
        /// XOR of the first seven response bytes
        expected: u8,
        /// Trailing checksum byte actually received
        received: u8,
    },
    /// UART response passed its checksum but does not answer the request
    UnexpectedResponse {
        /// Register that was requested
        expected: u8,
        /// Register the response carries
        received: u8,
    },
    /// Unit conversion rejected its input
    Conversion(ConversionError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Invalid microstep value (must be power of 2: 1, 2, 4, 8, 16, 32, 64, 128, 256)
    InvalidMicrosteps(u16),
    /// Register address uses bit 7, which is reserved for the access flag
    InvalidRegister(u8),
    /// Transport was built without a bus handle
    BusNotInitialized,
    /// UART transport was built without a delay provider
    DelayNotProvided,
    /// Driver facade has no transport bound
    TransportNotBound,
    /// Bus settings rejected by `setup()`
    RejectedBusSettings(heapless::String<64>),
    /// Select-line table is full
    TooManyDevices(usize),
    /// Device address bound twice in the select-line table
    DuplicateDevice(DeviceAddress),
    /// Select line could not be driven during setup
    SelectLineSetup(DeviceAddress),
    /// Invalid clock frequency (must be > 0)
    InvalidClock(u32),
    /// Invalid gear ratio (must be > 0)
    InvalidGearRatio(f32),
    /// Invalid full-step angle (must be in (0, 360))
    InvalidStepAngle(f32),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Low-level I/O faults reported by the HAL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportError {
    /// SPI bus transfer or flush failed
    Spi(spi::ErrorKind),
    /// Select line could not be switched
    SelectLine(digital::ErrorKind),
    /// Enable line could not be switched
    EnableLine(digital::ErrorKind),
    /// UART transmit or receive failed
    Serial(serial::ErrorKind),
}

/// Unit conversion errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversionError {
    /// Threshold speed of zero has no TSTEP equivalent
    ZeroThreshold,
    /// Input is NaN or infinite
    NotFinite,
    /// Ramp time must be strictly positive
    InvalidRampTime,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::UnknownDevice(addr) => write!(f, "Unknown device address {}", addr.value()),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::Timeout { received, timeout_ms } => {
                write!(f, "Timed out after {} ms ({} bytes received)", timeout_ms, received)
            }
            Error::Checksum { expected, received } => {
                write!(f, "Checksum mismatch: expected {:#04x}, received {:#04x}", expected, received)
            }
            Error::UnexpectedResponse { expected, received } => write!(
                f,
                "Response for register {:#04x} while reading {:#04x}",
                received, expected
            ),
            Error::Conversion(e) => write!(f, "Conversion error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "Invalid microsteps: {}. Valid values: 1, 2, 4, 8, 16, 32, 64, 128, 256", v)
            }
            ConfigError::InvalidRegister(r) => {
                write!(f, "Invalid register address {:#04x}: must fit in 7 bits", r)
            }
            ConfigError::BusNotInitialized => write!(f, "Bus not initialized"),
            ConfigError::DelayNotProvided => write!(f, "Delay provider is required"),
            ConfigError::TransportNotBound => write!(f, "No transport bound to driver"),
            ConfigError::RejectedBusSettings(msg) => write!(f, "Bus settings rejected: {}", msg),
            ConfigError::TooManyDevices(max) => write!(f, "Too many devices (max {})", max),
            ConfigError::DuplicateDevice(addr) => {
                write!(f, "Device address {} bound twice", addr.value())
            }
            ConfigError::SelectLineSetup(addr) => {
                write!(f, "Failed to deassert select line of device {}", addr.value())
            }
            ConfigError::InvalidClock(v) => write!(f, "Invalid clock frequency: {} Hz. Must be > 0", v),
            ConfigError::InvalidGearRatio(v) => write!(f, "Invalid gear ratio: {}. Must be > 0", v),
            ConfigError::InvalidStepAngle(v) => {
                write!(f, "Invalid step angle: {}. Must be in (0, 360)", v)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Spi(kind) => write!(f, "SPI fault: {}", kind),
            TransportError::SelectLine(kind) => write!(f, "Select line fault: {:?}", kind),
            TransportError::EnableLine(kind) => write!(f, "Enable line fault: {:?}", kind),
            TransportError::Serial(kind) => write!(f, "Serial fault: {}", kind),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::ZeroThreshold => write!(f, "Threshold speed must be non-zero"),
            ConversionError::NotFinite => write!(f, "Input must be a finite number"),
            ConversionError::InvalidRampTime => write!(f, "Ramp time must be > 0"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<ConversionError> for Error {
    fn from(e: ConversionError) -> Self {
        Error::Conversion(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

#[cfg(feature = "std")]
impl std::error::Error for ConversionError {}
