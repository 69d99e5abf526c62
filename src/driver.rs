//! Driver facade.
//!
//! Binds one transport and one device address, so register-definition code
//! can read and write registers without knowing which bus the chip sits on.
//! The facade keeps no copy of register state and never retries.

use core::convert::Infallible;

use embedded_hal::digital::{Error as _, ErrorType, OutputPin};

use crate::error::{ConfigError, Result, TransportError};
use crate::transport::{DeviceAddress, RegisterAddress, RegisterComm};

/// Placeholder for a driver wired without an enable line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnable;

impl ErrorType for NoEnable {
    type Error = Infallible;
}

impl OutputPin for NoEnable {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        Ok(())
    }
}

/// One chip on one transport.
///
/// Generic over:
/// - `T`: the transport (must implement [`RegisterComm`])
/// - `EN`: active-low enable line (defaults to [`NoEnable`])
pub struct Driver<T, EN = NoEnable>
where
    T: RegisterComm,
    EN: OutputPin,
{
    /// Bound transport, if any.
    transport: Option<T>,

    /// Address of this chip on the transport.
    address: DeviceAddress,

    /// ENN line gating the power stage.
    enable: Option<EN>,
}

impl<T> Driver<T, NoEnable>
where
    T: RegisterComm,
{
    /// Facade for the chip at `address` on `transport`.
    pub fn new(transport: T, address: DeviceAddress) -> Self {
        Self {
            transport: Some(transport),
            address,
            enable: None,
        }
    }

    /// Facade with no transport yet. Every access fails until [`bind`](Self::bind).
    pub fn unbound(address: DeviceAddress) -> Self {
        Self {
            transport: None,
            address,
            enable: None,
        }
    }
}

impl<T, EN> Driver<T, EN>
where
    T: RegisterComm,
    EN: OutputPin,
{
    /// Attach an active-low enable line.
    pub fn with_enable_pin<P: OutputPin>(self, pin: P) -> Driver<T, P> {
        Driver {
            transport: self.transport,
            address: self.address,
            enable: Some(pin),
        }
    }

    /// Bind a transport, returning the one it replaces.
    pub fn bind(&mut self, transport: T) -> Option<T> {
        self.transport.replace(transport)
    }

    /// Detach the transport.
    pub fn unbind(&mut self) -> Option<T> {
        self.transport.take()
    }

    /// Whether a transport is bound.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.transport.is_some()
    }

    /// Device address used for every access.
    #[inline]
    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Borrow the bound transport.
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Mutably borrow the bound transport.
    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    fn bound(&mut self) -> Result<&mut T> {
        match self.transport.as_mut() {
            Some(transport) => Ok(transport),
            None => {
                warn!("driver {}: no transport bound", self.address.value());
                Err(ConfigError::TransportNotBound.into())
            }
        }
    }

    /// Run the transport's setup.
    pub fn setup(&mut self) -> Result<()> {
        self.bound()?.setup()
    }

    /// Read a register of this chip.
    ///
    /// Over SPI the value is the one latched by the previous access; see
    /// [`SpiTransport`](crate::transport::SpiTransport).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TransportNotBound` if no transport is bound,
    /// otherwise whatever the transport reports.
    pub fn read_register(&mut self, register: RegisterAddress) -> Result<u32> {
        let address = self.address;
        self.bound()?.read_register(register, address)
    }

    /// Write a register of this chip.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TransportNotBound` if no transport is bound,
    /// otherwise whatever the transport reports.
    pub fn write_register(&mut self, register: RegisterAddress, value: u32) -> Result<()> {
        let address = self.address;
        self.bound()?.write_register(register, value, address)
    }

    /// Switch the power stage on (drive ENN low). No-op without an enable line.
    pub fn enable(&mut self) -> Result<()> {
        if let Some(pin) = self.enable.as_mut() {
            pin.set_low()
                .map_err(|e| TransportError::EnableLine(e.kind()))?;
            debug!("driver {}: enabled", self.address.value());
        }
        Ok(())
    }

    /// Switch the power stage off (drive ENN high). No-op without an enable line.
    pub fn disable(&mut self) -> Result<()> {
        if let Some(pin) = self.enable.as_mut() {
            pin.set_high()
                .map_err(|e| TransportError::EnableLine(e.kind()))?;
            debug!("driver {}: disabled", self.address.value());
        }
        Ok(())
    }

    /// Take the facade apart.
    pub fn release(self) -> (Option<T>, Option<EN>) {
        (self.transport, self.enable)
    }
}
