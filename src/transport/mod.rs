//! Register transports.
//!
//! Both transports implement [`RegisterComm`], the uniform read/write contract
//! consumed by the [`Driver`](crate::driver::Driver) facade.
//!
//! Transports perform no internal locking. Every access takes `&mut self`, so
//! sharing one transport between several callers requires external
//! serialization (a mutex, a critical section, or a single owning task).

pub mod frame;
pub mod spi;
pub mod uart;

use core::fmt;

use crate::error::{ConfigError, Result};

pub use spi::{SpiTransport, SpiTransportBuilder};
pub use uart::{UartPhase, UartTransport, UartTransportBuilder};

/// 7-bit register identifier.
///
/// Bit 7 is reserved for the access flag on both transports, so it can never
/// be set through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegisterAddress(u8);

impl RegisterAddress {
    /// Global configuration flags.
    pub const GCONF: Self = Self(0x00);
    /// Global status flags.
    pub const GSTAT: Self = Self(0x01);
    /// Input pin states and silicon version.
    pub const IOIN: Self = Self(0x04);
    /// Measured time between two microsteps.
    pub const TSTEP: Self = Self(0x12);
    /// Upper velocity threshold for stealthChop.
    pub const TPWMTHRS: Self = Self(0x13);
    /// Acceleration between VSTART and V1 / V1 and VMAX.
    pub const AMAX: Self = Self(0x26);
    /// Ramp target velocity.
    pub const VMAX: Self = Self(0x27);

    /// Largest representable address.
    pub const MAX: u8 = 0x7F;

    /// Create a register address, rejecting values with bit 7 set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRegister` if `value > 0x7F`.
    pub fn new(value: u8) -> core::result::Result<Self, ConfigError> {
        if value > Self::MAX {
            Err(ConfigError::InvalidRegister(value))
        } else {
            Ok(Self(value))
        }
    }

    /// Get the raw address.
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RegisterAddress {
    type Error = ConfigError;

    fn try_from(value: u8) -> core::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Logical device on a shared bus.
///
/// On SPI it selects an entry of the select-line table; on UART it is the
/// slave id embedded in every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DeviceAddress(pub u8);

impl DeviceAddress {
    /// Create a new device address.
    #[inline]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Get the raw address.
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for DeviceAddress {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Register communication capability implemented by every transport.
pub trait RegisterComm {
    /// Configure the bus and put all device lines into their idle state.
    fn setup(&mut self) -> Result<()>;

    /// Write a 32-bit value to `register` on `device`.
    fn write_register(
        &mut self,
        register: RegisterAddress,
        value: u32,
        device: DeviceAddress,
    ) -> Result<()>;

    /// Read a 32-bit value from `register` on `device`.
    ///
    /// On SPI the returned value belongs to the *previous* access; see
    /// [`SpiTransport`].
    fn read_register(&mut self, register: RegisterAddress, device: DeviceAddress) -> Result<u32>;
}

impl<T: RegisterComm + ?Sized> RegisterComm for &mut T {
    fn setup(&mut self) -> Result<()> {
        (**self).setup()
    }

    fn write_register(
        &mut self,
        register: RegisterAddress,
        value: u32,
        device: DeviceAddress,
    ) -> Result<()> {
        (**self).write_register(register, value, device)
    }

    fn read_register(&mut self, register: RegisterAddress, device: DeviceAddress) -> Result<u32> {
        (**self).read_register(register, device)
    }
}
