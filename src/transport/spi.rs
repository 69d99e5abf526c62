//! SPI register transport.
//!
//! One 5-byte full-duplex datagram per register access. Several chips share
//! the bus; each is addressed through its own active-low select line, looked
//! up in a fixed-capacity table. A single-chip setup is a table of one.
//!
//! # Read latency
//!
//! The chip answers every datagram with the data latched by the *previous*
//! one. [`read_register`](RegisterComm::read_register) therefore returns the
//! result of whatever access came before it. To read register R, read R
//! twice and use the second value (or follow the first read with any other
//! access). The transport never does this on its own.

use embedded_hal::digital::{Error as _, OutputPin};
use embedded_hal::spi::{Error as _, SpiBus};
use heapless::LinearMap;

use crate::config::SpiSettings;
use crate::error::{ConfigError, Error, Result, TransportError};

use super::frame::{encode_spi_datagram, SpiResponse, SPI_FRAME_LEN};
use super::{DeviceAddress, RegisterAddress, RegisterComm};

/// SPI transport generic over an embedded-hal bus and select-line pins.
///
/// Generic over:
/// - `BUS`: the SPI bus (must implement `SpiBus<u8>`)
/// - `CS`: select-line pin type (must implement `OutputPin`)
/// - `N`: capacity of the select-line table
pub struct SpiTransport<BUS, CS, const N: usize = 4>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
{
    /// Bus shared by every device in the table.
    bus: BUS,

    /// Device address → select line.
    select: LinearMap<DeviceAddress, CS, N>,

    /// Settings checked by `setup()`.
    settings: SpiSettings,

    /// SPI status byte of the most recent exchange.
    last_status: Option<u8>,
}

impl<BUS, CS, const N: usize> SpiTransport<BUS, CS, N>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
{
    /// Start building a transport.
    pub fn builder() -> SpiTransportBuilder<BUS, CS, N> {
        SpiTransportBuilder::new()
    }

    /// Transport for a single device: a select table of size one.
    pub fn single(bus: BUS, device: DeviceAddress, cs: CS, settings: SpiSettings) -> Result<Self> {
        Self::builder().bus(bus).device(device, cs).settings(settings).build()
    }

    /// Get the bus settings.
    #[inline]
    pub fn settings(&self) -> &SpiSettings {
        &self.settings
    }

    /// Addresses bound to a select line.
    pub fn devices(&self) -> impl Iterator<Item = DeviceAddress> + '_ {
        self.select.keys().copied()
    }

    /// Whether `device` has a select line.
    #[inline]
    pub fn has_device(&self, device: DeviceAddress) -> bool {
        self.select.contains_key(&device)
    }

    /// SPI status byte returned by the most recent successful exchange.
    #[inline]
    pub fn last_status(&self) -> Option<u8> {
        self.last_status
    }

    /// Read a register and keep the SPI status byte.
    ///
    /// Same latency as [`read_register`](RegisterComm::read_register): both
    /// fields belong to the previous access.
    pub fn read_register_with_status(
        &mut self,
        register: RegisterAddress,
        device: DeviceAddress,
    ) -> Result<SpiResponse> {
        self.exchange(encode_spi_datagram(register, 0, false), device)
    }

    /// Release the bus and the select lines.
    pub fn release(self) -> (BUS, LinearMap<DeviceAddress, CS, N>) {
        (self.bus, self.select)
    }

    /// Run one datagram with the device's select line held low.
    ///
    /// The line is driven high again on every path out of this function,
    /// including bus faults.
    fn exchange(&mut self, tx: [u8; SPI_FRAME_LEN], device: DeviceAddress) -> Result<SpiResponse> {
        let Some(cs) = self.select.get_mut(&device) else {
            warn!("spi: no select line for device {}", device.value());
            return Err(Error::UnknownDevice(device));
        };

        if let Err(e) = cs.set_low() {
            let _ = cs.set_high();
            return Err(TransportError::SelectLine(e.kind()).into());
        }

        let mut rx = [0u8; SPI_FRAME_LEN];
        let transfer = self
            .bus
            .transfer(&mut rx, &tx)
            .and_then(|()| self.bus.flush());
        let release = cs.set_high();

        if let Err(e) = transfer {
            warn!("spi: transfer to device {} failed", device.value());
            return Err(TransportError::Spi(e.kind()).into());
        }
        release.map_err(|e| TransportError::SelectLine(e.kind()))?;

        trace!("spi: device {} tx {} rx {}", device.value(), tx, rx);
        let response = SpiResponse::decode(&rx);
        self.last_status = Some(response.status);
        Ok(response)
    }
}

impl<BUS, CS, const N: usize> RegisterComm for SpiTransport<BUS, CS, N>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
{
    /// Check the bus settings and deassert every select line.
    fn setup(&mut self) -> Result<()> {
        self.settings.validate()?;
        for (device, cs) in self.select.iter_mut() {
            cs.set_high()
                .map_err(|_| ConfigError::SelectLineSetup(*device))?;
        }
        debug!("spi: {} select lines idle", self.select.len());
        Ok(())
    }

    fn write_register(
        &mut self,
        register: RegisterAddress,
        value: u32,
        device: DeviceAddress,
    ) -> Result<()> {
        self.exchange(encode_spi_datagram(register, value, true), device)
            .map(|_| ())
    }

    fn read_register(&mut self, register: RegisterAddress, device: DeviceAddress) -> Result<u32> {
        self.read_register_with_status(register, device)
            .map(|response| response.value)
    }
}

/// Builder for creating SpiTransport instances.
pub struct SpiTransportBuilder<BUS, CS, const N: usize = 4>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
{
    bus: Option<BUS>,
    select: LinearMap<DeviceAddress, CS, N>,
    settings: SpiSettings,
    error: Option<ConfigError>,
}

impl<BUS, CS, const N: usize> Default for SpiTransportBuilder<BUS, CS, N>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<BUS, CS, const N: usize> SpiTransportBuilder<BUS, CS, N>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            bus: None,
            select: LinearMap::new(),
            settings: SpiSettings::default(),
            error: None,
        }
    }

    /// Set the SPI bus.
    pub fn bus(mut self, bus: BUS) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Bind a device address to its select line.
    ///
    /// A duplicate address or a full table is reported by [`build`](Self::build).
    pub fn device(mut self, device: DeviceAddress, cs: CS) -> Self {
        if self.error.is_some() {
            return self;
        }
        if self.select.contains_key(&device) {
            self.error = Some(ConfigError::DuplicateDevice(device));
        } else if self.select.insert(device, cs).is_err() {
            self.error = Some(ConfigError::TooManyDevices(N));
        }
        self
    }

    /// Set the bus settings.
    pub fn settings(mut self, settings: SpiSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the SpiTransport.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::BusNotInitialized` if no bus was given, or the
    /// first select-table error recorded by [`device`](Self::device).
    pub fn build(self) -> Result<SpiTransport<BUS, CS, N>> {
        if let Some(e) = self.error {
            return Err(e.into());
        }
        let bus = self.bus.ok_or(ConfigError::BusNotInitialized)?;

        Ok(SpiTransport {
            bus,
            select: self.select,
            settings: self.settings,
            last_status: None,
        })
    }
}
