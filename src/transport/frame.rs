//! Wire formats for both transports.
//!
//! All register values travel big-endian. Pure functions only, so the
//! transports stay thin and the byte layouts can be tested without hardware.

use crate::error::{Error, Result};

use super::{DeviceAddress, RegisterAddress};

/// Length of one SPI datagram, in both directions.
pub const SPI_FRAME_LEN: usize = 5;

/// Access flag OR-ed into the address byte for register writes.
pub const WRITE_FLAG: u8 = 0x80;

/// Leading byte of every UART packet.
pub const UART_SYNC: u8 = 0x05;

/// Length of a UART write packet.
pub const UART_WRITE_LEN: usize = 8;

/// Length of a UART read request.
pub const UART_READ_REQUEST_LEN: usize = 4;

/// Length of a UART read response.
pub const UART_READ_RESPONSE_LEN: usize = 8;

/// XOR of every byte in `bytes`.
#[inline]
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Build a 5-byte SPI datagram `[address][b3][b2][b1][b0]`.
///
/// `write` sets the access flag in the address byte.
pub fn encode_spi_datagram(register: RegisterAddress, value: u32, write: bool) -> [u8; SPI_FRAME_LEN] {
    let header = if write {
        register.value() | WRITE_FLAG
    } else {
        register.value()
    };
    let [b3, b2, b1, b0] = value.to_be_bytes();
    [header, b3, b2, b1, b0]
}

/// Decoded SPI response.
///
/// `value` is the register content latched by the *previous* datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiResponse {
    /// SPI_STATUS byte shifted out while the address byte was shifted in.
    pub status: u8,
    /// Big-endian payload of bytes 1..=4.
    pub value: u32,
}

impl SpiResponse {
    /// Decode a received datagram.
    pub fn decode(rx: &[u8; SPI_FRAME_LEN]) -> Self {
        Self {
            status: rx[0],
            value: u32::from_be_bytes([rx[1], rx[2], rx[3], rx[4]]),
        }
    }
}

/// Build the 8-byte UART write packet, checksum included.
pub fn encode_write_packet(
    slave: DeviceAddress,
    register: RegisterAddress,
    value: u32,
) -> [u8; UART_WRITE_LEN] {
    let [b3, b2, b1, b0] = value.to_be_bytes();
    let mut packet = [
        UART_SYNC,
        slave.value(),
        register.value() | WRITE_FLAG,
        b3,
        b2,
        b1,
        b0,
        0,
    ];
    packet[UART_WRITE_LEN - 1] = xor_checksum(&packet[..UART_WRITE_LEN - 1]);
    packet
}

/// Build the 4-byte UART read request, checksum included.
pub fn encode_read_request(slave: DeviceAddress, register: RegisterAddress) -> [u8; UART_READ_REQUEST_LEN] {
    let mut packet = [UART_SYNC, slave.value(), register.value() & !WRITE_FLAG, 0];
    packet[3] = xor_checksum(&packet[..3]);
    packet
}

/// Decoded UART read response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResponse {
    /// Address byte echoed by the chip.
    pub address: u8,
    /// Register byte echoed by the chip.
    pub register: u8,
    /// Register content.
    pub value: u32,
}

impl ReadResponse {
    /// Validate the checksum and decode a read response.
    ///
    /// A response with a bad checksum is rejected as a whole; no field of it
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns `Error::Checksum` if the trailing byte does not equal the XOR
    /// of bytes 0–6.
    pub fn decode(rx: &[u8; UART_READ_RESPONSE_LEN]) -> Result<Self> {
        let expected = xor_checksum(&rx[..UART_READ_RESPONSE_LEN - 1]);
        let received = rx[UART_READ_RESPONSE_LEN - 1];
        if expected != received {
            return Err(Error::Checksum { expected, received });
        }

        Ok(Self {
            address: rx[1],
            register: rx[2],
            value: u32::from_be_bytes([rx[3], rx[4], rx[5], rx[6]]),
        })
    }

    /// Encode a response the way the chip would send it (used by bus fakes).
    pub fn encode(&self) -> [u8; UART_READ_RESPONSE_LEN] {
        let [b3, b2, b1, b0] = self.value.to_be_bytes();
        let mut packet = [UART_SYNC, self.address, self.register, b3, b2, b1, b0, 0];
        packet[UART_READ_RESPONSE_LEN - 1] = xor_checksum(&packet[..UART_READ_RESPONSE_LEN - 1]);
        packet
    }
}
