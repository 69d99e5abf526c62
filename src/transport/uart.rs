//! UART register transport.
//!
//! Packetized request/response over a shared asynchronous line. There is no
//! select signal; the device address travels inside every packet as the
//! slave id.
//!
//! Each register access is a polled exchange raced against a fixed
//! [`UART_TIMEOUT_MS`] bound. The exchange is a plain value on the stack: when
//! the bound wins it is simply dropped, nothing is left to complete later,
//! and any late bytes are drained before the next request goes out.

use embedded_hal::delay::DelayNs;
use embedded_hal_nb::serial::{Error as _, Read, Write};

use crate::config::{UartSettings, UART_TIMEOUT_MS};
use crate::error::{ConfigError, Error, Result, TransportError};

use super::frame::{
    encode_read_request, encode_write_packet, ReadResponse, UART_READ_REQUEST_LEN,
    UART_READ_RESPONSE_LEN, UART_SYNC, UART_WRITE_LEN,
};
use super::{DeviceAddress, RegisterAddress, RegisterComm};

/// Upper bound on stale bytes discarded before a read request.
const MAX_DRAIN: usize = 64;

/// Progress of the most recent register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UartPhase {
    /// No access started yet.
    #[default]
    Idle,
    /// Packet is being shifted out.
    Sending,
    /// Request sent, response not complete.
    AwaitingResponse,
    /// Access finished successfully.
    Complete,
    /// Bound expired before the access finished.
    TimedOut,
    /// Response failed its checksum or did not answer the request.
    ChecksumError,
    /// The serial port reported a fault.
    Fault,
}

/// Countdown of the time bound, advanced only while the line is idle.
struct Deadline {
    remaining_us: u32,
    step_us: u32,
}

impl Deadline {
    fn new(timeout_ms: u32, step_us: u32) -> Self {
        Self {
            remaining_us: timeout_ms.saturating_mul(1000),
            step_us: step_us.max(1),
        }
    }

    /// Wait one poll interval. Returns `false` once the bound is used up.
    fn wait<D: DelayNs>(&mut self, delay: &mut D) -> bool {
        if self.remaining_us == 0 {
            return false;
        }
        let step = self.step_us.min(self.remaining_us);
        delay.delay_us(step);
        self.remaining_us -= step;
        true
    }
}

/// One in-flight packet exchange: send `tx`, skip the echo, collect `RX`
/// response bytes.
struct Exchange<const TX: usize, const RX: usize> {
    tx: [u8; TX],
    sent: usize,
    flushed: bool,
    echo: usize,
    rx: [u8; RX],
    received: usize,
}

impl<const TX: usize, const RX: usize> Exchange<TX, RX> {
    fn new(tx: [u8; TX], single_wire: bool) -> Self {
        Self {
            tx,
            sent: 0,
            flushed: false,
            echo: if single_wire { TX } else { 0 },
            rx: [0; RX],
            received: 0,
        }
    }

    fn is_sent(&self) -> bool {
        self.flushed
    }

    /// Advance as far as the line allows without blocking.
    fn poll<S>(&mut self, serial: &mut S) -> nb::Result<(), S::Error>
    where
        S: Read<u8> + Write<u8>,
    {
        while self.sent < TX {
            serial.write(self.tx[self.sent])?;
            self.sent += 1;
        }
        if !self.flushed {
            serial.flush()?;
            self.flushed = true;
        }
        while self.echo > 0 {
            serial.read()?;
            self.echo -= 1;
        }
        while self.received < RX {
            self.rx[self.received] = serial.read()?;
            self.received += 1;
        }
        Ok(())
    }
}

/// UART transport generic over an embedded-hal-nb serial port and a delay.
///
/// Generic over:
/// - `SERIAL`: the serial port (must implement `Read<u8>` and `Write<u8>`)
/// - `DELAY`: delay provider pacing the poll loop (must implement `DelayNs`)
pub struct UartTransport<SERIAL, DELAY>
where
    SERIAL: Read<u8> + Write<u8>,
    DELAY: DelayNs,
{
    /// Serial port shared by every device on the line.
    serial: SERIAL,

    /// Paces polling while the line is idle.
    delay: DELAY,

    /// Settings checked by `setup()`.
    settings: UartSettings,

    /// Phase of the most recent access.
    phase: UartPhase,
}

impl<SERIAL, DELAY> UartTransport<SERIAL, DELAY>
where
    SERIAL: Read<u8> + Write<u8>,
    DELAY: DelayNs,
{
    /// Start building a transport.
    pub fn builder() -> UartTransportBuilder<SERIAL, DELAY> {
        UartTransportBuilder::new()
    }

    /// Get the line settings.
    #[inline]
    pub fn settings(&self) -> &UartSettings {
        &self.settings
    }

    /// Phase the most recent access ended in (or is in).
    #[inline]
    pub fn phase(&self) -> UartPhase {
        self.phase
    }

    /// Release the serial port and the delay provider.
    pub fn release(self) -> (SERIAL, DELAY) {
        (self.serial, self.delay)
    }

    /// Discard whatever is waiting in the receive buffer.
    fn drain(&mut self) -> usize {
        let mut dropped = 0;
        while dropped < MAX_DRAIN && self.serial.read().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("uart: drained {} stale bytes", dropped);
        }
        dropped
    }

    /// Drive `exchange` to completion or until the time bound expires.
    fn run<const TX: usize, const RX: usize>(&mut self, exchange: &mut Exchange<TX, RX>) -> Result<()> {
        self.phase = UartPhase::Sending;
        let mut deadline = Deadline::new(UART_TIMEOUT_MS, self.settings.poll_interval_us);

        loop {
            let outcome = exchange.poll(&mut self.serial);
            if exchange.is_sent() && RX > 0 {
                self.phase = UartPhase::AwaitingResponse;
            }

            match outcome {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => {
                    self.phase = UartPhase::Fault;
                    warn!("uart: line fault");
                    return Err(TransportError::Serial(e.kind()).into());
                }
                Err(nb::Error::WouldBlock) => {
                    if !deadline.wait(&mut self.delay) {
                        self.phase = UartPhase::TimedOut;
                        warn!(
                            "uart: timed out after {} ms ({} of {} bytes)",
                            UART_TIMEOUT_MS,
                            exchange.received,
                            RX
                        );
                        return Err(Error::Timeout {
                            received: exchange.received,
                            timeout_ms: UART_TIMEOUT_MS,
                        });
                    }
                }
            }
        }
    }
}

impl<SERIAL, DELAY> RegisterComm for UartTransport<SERIAL, DELAY>
where
    SERIAL: Read<u8> + Write<u8>,
    DELAY: DelayNs,
{
    /// Check for 115200 baud 8N1 and reset the access phase.
    fn setup(&mut self) -> Result<()> {
        self.settings.validate()?;
        self.phase = UartPhase::Idle;
        Ok(())
    }

    fn write_register(
        &mut self,
        register: RegisterAddress,
        value: u32,
        device: DeviceAddress,
    ) -> Result<()> {
        let packet = encode_write_packet(device, register, value);
        trace!("uart: tx {}", packet);

        let mut exchange = Exchange::<UART_WRITE_LEN, 0>::new(packet, self.settings.single_wire);
        self.run(&mut exchange)?;
        self.phase = UartPhase::Complete;
        Ok(())
    }

    fn read_register(&mut self, register: RegisterAddress, device: DeviceAddress) -> Result<u32> {
        self.drain();

        let request = encode_read_request(device, register);
        trace!("uart: tx {}", request);

        let mut exchange = Exchange::<UART_READ_REQUEST_LEN, UART_READ_RESPONSE_LEN>::new(
            request,
            self.settings.single_wire,
        );
        self.run(&mut exchange)?;
        trace!("uart: rx {}", exchange.rx);

        let response = match ReadResponse::decode(&exchange.rx) {
            Ok(response) => response,
            Err(e) => {
                self.phase = UartPhase::ChecksumError;
                warn!("uart: checksum mismatch reading register {}", register.value());
                return Err(e);
            }
        };

        // A late reply to an earlier request can still carry a valid checksum
        if exchange.rx[0] != UART_SYNC || response.register != register.value() {
            self.phase = UartPhase::ChecksumError;
            warn!(
                "uart: reply for register {} while reading {}",
                response.register,
                register.value()
            );
            return Err(Error::UnexpectedResponse {
                expected: register.value(),
                received: response.register,
            });
        }

        self.phase = UartPhase::Complete;
        Ok(response.value)
    }
}

/// Builder for creating UartTransport instances.
pub struct UartTransportBuilder<SERIAL, DELAY>
where
    SERIAL: Read<u8> + Write<u8>,
    DELAY: DelayNs,
{
    serial: Option<SERIAL>,
    delay: Option<DELAY>,
    settings: UartSettings,
}

impl<SERIAL, DELAY> Default for UartTransportBuilder<SERIAL, DELAY>
where
    SERIAL: Read<u8> + Write<u8>,
    DELAY: DelayNs,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<SERIAL, DELAY> UartTransportBuilder<SERIAL, DELAY>
where
    SERIAL: Read<u8> + Write<u8>,
    DELAY: DelayNs,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            serial: None,
            delay: None,
            settings: UartSettings::default(),
        }
    }

    /// Set the serial port.
    pub fn serial(mut self, serial: SERIAL) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Set the delay provider.
    pub fn delay(mut self, delay: DELAY) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the line settings.
    pub fn settings(mut self, settings: UartSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the UartTransport.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::BusNotInitialized` without a serial port,
    /// `ConfigError::DelayNotProvided` without a delay provider and
    /// `ConfigError::RejectedBusSettings` for settings `setup()` would refuse.
    pub fn build(self) -> Result<UartTransport<SERIAL, DELAY>> {
        let serial = self.serial.ok_or(ConfigError::BusNotInitialized)?;
        let delay = self.delay.ok_or(ConfigError::DelayNotProvided)?;
        self.settings.validate()?;

        Ok(UartTransport {
            serial,
            delay,
            settings: self.settings,
            phase: UartPhase::Idle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parity;
    use embedded_hal_nb::serial::{ErrorKind, ErrorType};
    use std::collections::VecDeque;

    /// Scripted serial line: records what is written, replays queued bytes.
    #[derive(Default)]
    struct ScriptedLine {
        written: Vec<u8>,
        incoming: VecDeque<u8>,
        /// Bytes queued once a full read request has been written.
        reply: Option<[u8; 8]>,
        echo: bool,
        fail_reads: bool,
        stall_writes: bool,
    }

    impl ErrorType for ScriptedLine {
        type Error = ErrorKind;
    }

    impl Read<u8> for ScriptedLine {
        fn read(&mut self) -> nb::Result<u8, ErrorKind> {
            if self.fail_reads {
                return Err(nb::Error::Other(ErrorKind::Parity));
            }
            self.incoming.pop_front().ok_or(nb::Error::WouldBlock)
        }
    }

    impl Write<u8> for ScriptedLine {
        fn write(&mut self, word: u8) -> nb::Result<(), ErrorKind> {
            if self.stall_writes {
                return Err(nb::Error::WouldBlock);
            }
            self.written.push(word);
            if self.echo {
                self.incoming.push_back(word);
            }
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), ErrorKind> {
            if self.written.len() % 4 == 0 && self.written.len() >= 4 {
                if let Some(reply) = self.reply.take() {
                    self.incoming.extend(reply);
                }
            }
            Ok(())
        }
    }

    /// Delay that only accumulates the requested time.
    #[derive(Default)]
    struct Elapsed {
        ns: u64,
    }

    impl DelayNs for Elapsed {
        fn delay_ns(&mut self, ns: u32) {
            self.ns += ns as u64;
        }
    }

    fn transport(line: ScriptedLine) -> UartTransport<ScriptedLine, Elapsed> {
        UartTransport::builder()
            .serial(line)
            .delay(Elapsed::default())
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_serial_and_delay() {
        let result = UartTransportBuilder::<ScriptedLine, Elapsed>::new()
            .delay(Elapsed::default())
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::BusNotInitialized))
        ));

        let result = UartTransportBuilder::<ScriptedLine, Elapsed>::new()
            .serial(ScriptedLine::default())
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::DelayNotProvided))
        ));
    }

    #[test]
    fn test_build_rejects_non_8n1() {
        let result = UartTransport::builder()
            .serial(ScriptedLine::default())
            .delay(Elapsed::default())
            .settings(UartSettings { parity: Parity::Odd, ..UartSettings::default() })
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::RejectedBusSettings(_)))
        ));

        let mut uart = transport(ScriptedLine::default());
        assert!(uart.setup().is_ok());
        assert_eq!(uart.phase(), UartPhase::Idle);
    }

    #[test]
    fn test_build_rejects_zero_poll_interval() {
        let result = UartTransport::builder()
            .serial(ScriptedLine::default())
            .delay(Elapsed::default())
            .settings(UartSettings { poll_interval_us: 0, ..UartSettings::default() })
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::RejectedBusSettings(_)))
        ));
    }

    #[test]
    fn test_deadline_expires_with_zero_step() {
        let mut deadline = Deadline::new(UART_TIMEOUT_MS, 0);
        let mut delay = Elapsed::default();
        let mut waits = 0u32;
        while deadline.wait(&mut delay) {
            waits += 1;
            assert!(waits <= UART_TIMEOUT_MS * 1000, "deadline never expired");
        }
        assert_eq!(waits, UART_TIMEOUT_MS * 1000);
        assert_eq!(delay.ns, UART_TIMEOUT_MS as u64 * 1_000_000);
    }

    #[test]
    fn test_write_register_sends_checksummed_packet() {
        let mut uart = transport(ScriptedLine::default());
        uart.write_register(RegisterAddress::VMAX, 0x0001_176F, DeviceAddress(1))
            .unwrap();
        assert_eq!(uart.phase(), UartPhase::Complete);

        let (line, _) = uart.release();
        let expected = encode_write_packet(DeviceAddress(1), RegisterAddress::VMAX, 0x0001_176F);
        assert_eq!(line.written, expected);
        assert_eq!(line.written[2], 0xA7);
    }

    #[test]
    fn test_read_register_decodes_response() {
        let reply = ReadResponse { address: 0xFF, register: 0x04, value: 0x3000_0041 }.encode();
        let mut uart = transport(ScriptedLine { reply: Some(reply), ..ScriptedLine::default() });

        let value = uart.read_register(RegisterAddress::IOIN, DeviceAddress(0)).unwrap();
        assert_eq!(value, 0x3000_0041);
        assert_eq!(uart.phase(), UartPhase::Complete);

        let (line, delay) = uart.release();
        assert_eq!(line.written, [0x05, 0x00, 0x04, 0x01]);
        assert_eq!(delay.ns, 0);
    }

    #[test]
    fn test_read_register_checksum_error() {
        let mut reply = ReadResponse { address: 0xFF, register: 0x04, value: 7 }.encode();
        let good = reply[7];
        reply[7] = good.wrapping_add(1);
        let mut uart = transport(ScriptedLine { reply: Some(reply), ..ScriptedLine::default() });

        assert_eq!(
            uart.read_register(RegisterAddress::IOIN, DeviceAddress(0)),
            Err(Error::Checksum { expected: good, received: good.wrapping_add(1) })
        );
        assert_eq!(uart.phase(), UartPhase::ChecksumError);
    }

    #[test]
    fn test_read_register_times_out_on_silence() {
        let mut uart = transport(ScriptedLine::default());

        assert_eq!(
            uart.read_register(RegisterAddress::GSTAT, DeviceAddress(0)),
            Err(Error::Timeout { received: 0, timeout_ms: UART_TIMEOUT_MS })
        );
        assert_eq!(uart.phase(), UartPhase::TimedOut);

        let (_, delay) = uart.release();
        assert_eq!(delay.ns, UART_TIMEOUT_MS as u64 * 1_000_000);
    }

    #[test]
    fn test_partial_response_times_out() {
        let mut line = ScriptedLine::default();
        line.incoming.extend([0x05, 0xFF, 0x01]);
        // queued before the request, so it is drained as stale
        let mut uart = transport(line);

        assert!(matches!(
            uart.read_register(RegisterAddress::GSTAT, DeviceAddress(0)),
            Err(Error::Timeout { received: 0, .. })
        ));
    }

    #[test]
    fn test_stalled_write_times_out() {
        let mut uart = transport(ScriptedLine { stall_writes: true, ..ScriptedLine::default() });

        assert!(matches!(
            uart.write_register(RegisterAddress::GCONF, 0, DeviceAddress(0)),
            Err(Error::Timeout { .. })
        ));
        assert_eq!(uart.phase(), UartPhase::TimedOut);
    }

    #[test]
    fn test_line_fault_is_transport_error() {
        let reply = ReadResponse { address: 0xFF, register: 0x01, value: 0 }.encode();
        let mut uart = transport(ScriptedLine {
            reply: Some(reply),
            fail_reads: true,
            ..ScriptedLine::default()
        });

        assert_eq!(
            uart.read_register(RegisterAddress::GSTAT, DeviceAddress(0)),
            Err(Error::Transport(TransportError::Serial(ErrorKind::Parity)))
        );
        assert_eq!(uart.phase(), UartPhase::Fault);
    }

    #[test]
    fn test_reply_for_other_register_is_rejected() {
        // Valid checksum, but it answers GSTAT while IOIN was requested
        let reply = ReadResponse { address: 0xFF, register: 0x01, value: 0xBAD }.encode();
        let mut uart = transport(ScriptedLine { reply: Some(reply), ..ScriptedLine::default() });

        assert_eq!(
            uart.read_register(RegisterAddress::IOIN, DeviceAddress(0)),
            Err(Error::UnexpectedResponse { expected: 0x04, received: 0x01 })
        );
        assert_eq!(uart.phase(), UartPhase::ChecksumError);
    }

    #[test]
    fn test_reply_without_sync_is_rejected() {
        let mut reply = ReadResponse { address: 0xFF, register: 0x04, value: 1 }.encode();
        reply[0] = 0x0A;
        reply[7] ^= 0x05 ^ 0x0A;
        let mut uart = transport(ScriptedLine { reply: Some(reply), ..ScriptedLine::default() });

        assert!(matches!(
            uart.read_register(RegisterAddress::IOIN, DeviceAddress(0)),
            Err(Error::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn test_late_bytes_do_not_leak_into_next_read() {
        let mut uart = transport(ScriptedLine::default());
        assert!(uart.read_register(RegisterAddress::GSTAT, DeviceAddress(0)).is_err());

        // The late answer to the timed-out request lands, then a fresh reply
        let (mut line, delay) = uart.release();
        line.incoming
            .extend(ReadResponse { address: 0xFF, register: 0x01, value: 0xBAD }.encode());
        line.reply = Some(ReadResponse { address: 0xFF, register: 0x01, value: 0x600D }.encode());
        let mut uart = UartTransport::builder().serial(line).delay(delay).build().unwrap();

        assert_eq!(
            uart.read_register(RegisterAddress::GSTAT, DeviceAddress(0)),
            Ok(0x600D)
        );
    }

    #[test]
    fn test_single_wire_echo_is_skipped() {
        let reply = ReadResponse { address: 0xFF, register: 0x27, value: 51_200 }.encode();
        let line = ScriptedLine { reply: Some(reply), echo: true, ..ScriptedLine::default() };
        let mut uart = UartTransport::builder()
            .serial(line)
            .delay(Elapsed::default())
            .settings(UartSettings { single_wire: true, ..UartSettings::default() })
            .build()
            .unwrap();

        assert_eq!(
            uart.read_register(RegisterAddress::VMAX, DeviceAddress(0)),
            Ok(51_200)
        );
        uart.write_register(RegisterAddress::VMAX, 1, DeviceAddress(0))
            .unwrap();
        let (line, _) = uart.release();
        assert!(line.incoming.is_empty());
    }
}
