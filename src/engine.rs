use std::io;

use i2c::Message;
use log::debug;

use crate::framing::{AddressMode, Framing, MAX_WRITE_LEN};
use crate::transport::{LinuxTransport, Transport};
use crate::{Error, Result};

/// Number of times a read transaction is attempted before giving up. Bounded
/// so a scan of an unresponsive address always terminates promptly.
pub const DEFAULT_READ_ATTEMPTS: u32 = 10;

/// Upper bound (exclusive) of the 7-bit chip address space scanned by
/// [`I2c::scan`].
pub const ADDRESS_SPACE: u8 = 127;

/// One opened I2C bus. Owns the underlying transport exclusively; the device
/// node is closed when the value is dropped.
pub struct I2c<T: Transport> {
    transport: T,
    read_attempts: u32,
}

impl I2c<LinuxTransport> {
    /// Opens `/dev/i2c-<bus>`.
    pub fn open(bus: u32) -> Result<Self> {
        Ok(Self::new(LinuxTransport::open(bus)?))
    }
}

impl<T: Transport> I2c<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            read_attempts: DEFAULT_READ_ATTEMPTS,
        }
    }

    /// Overrides the read retry budget. Clamped to at least one attempt.
    pub fn with_read_attempts(mut self, attempts: u32) -> Self {
        self.read_attempts = attempts.max(1);
        self
    }

    /// Releases the underlying transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Writes `data` to `chip` at `offset`. The offset bytes selected by
    /// `mode` and the payload go out in a single write segment. Writes are
    /// never retried: a failed write may have partially taken effect, and
    /// repeating it blindly is unsafe without device-specific knowledge.
    pub fn write(&mut self, chip: u8, mode: AddressMode, offset: u32, data: &[u8]) -> Result<()> {
        let framing = Framing::new(chip, mode, offset);
        if framing.prefix().len() + data.len() > MAX_WRITE_LEN {
            return Err(Error::WriteTooLong {
                payload: data.len(),
                framing: framing.prefix().len(),
                limit: MAX_WRITE_LEN,
            });
        }

        let mut buffer = Vec::with_capacity(framing.prefix().len() + data.len());
        buffer.extend_from_slice(framing.prefix());
        buffer.extend_from_slice(data);

        self.transport
            .submit(&mut [Message::Write {
                address: framing.target(),
                data: &buffer,
                flags: Default::default(),
            }])
            .map_err(|e| {
                debug!("write to chip 0x{:02x} at offset 0x{:x} failed: {}", chip, offset, e);
                Error::Transport {
                    attempts: 1,
                    source: e,
                }
            })
    }

    /// Reads `buf.len()` bytes from `chip` at `offset`. When `mode` carries
    /// offset bytes they are sent as a leading write segment of the same
    /// atomic transaction. The whole transaction is retried up to the attempt
    /// budget; transient arbitration losses and slave NACKs are common enough
    /// on shared buses that a single failure is not conclusive.
    pub fn read(&mut self, chip: u8, mode: AddressMode, offset: u32, buf: &mut [u8]) -> Result<()> {
        let framing = Framing::new(chip, mode, offset);
        let mut last_failure = None;
        for attempt in 1..=self.read_attempts {
            let result = match framing.prefix() {
                [] => self.transport.submit(&mut [Message::Read {
                    address: framing.target(),
                    data: &mut *buf,
                    flags: Default::default(),
                }]),
                prefix => self.transport.submit(&mut [
                    Message::Write {
                        address: framing.target(),
                        data: prefix,
                        flags: Default::default(),
                    },
                    Message::Read {
                        address: framing.target(),
                        data: &mut *buf,
                        flags: Default::default(),
                    },
                ]),
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(
                        "read from chip 0x{:02x} at offset 0x{:x} failed in round {}: {}",
                        chip, offset, attempt, e
                    );
                    last_failure = Some(e);
                }
            }
        }
        Err(Error::Transport {
            attempts: self.read_attempts,
            source: last_failure.unwrap_or_else(|| io::Error::other("no attempts made")),
        })
    }

    /// True iff a one-byte zero-offset read from `chip` is acknowledged.
    /// That is the minimal transaction that provokes an ACK or NACK from a
    /// listening device without assuming anything about its registers.
    pub fn probe(&mut self, chip: u8) -> bool {
        let mut scratch = [0u8; 1];
        self.read(chip, AddressMode::None, 0, &mut scratch).is_ok()
    }

    /// Probes every 7-bit address and returns the ones that responded. A
    /// silent address is an expected outcome, not an error, so the scan never
    /// aborts early.
    pub fn scan(&mut self) -> Vec<u8> {
        (0..ADDRESS_SPACE).filter(|&addr| self.probe(addr)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Segment};

    #[test]
    fn test_write_one_byte_offset_layout() {
        let transport = MockTransport::new().with_chip(0x50, 1);
        let mut i2c = I2c::new(transport);
        i2c.write(0x50, AddressMode::OneByte, 0x03, &[0x26, 0x57, 0x78])
            .unwrap();

        let transport = i2c.into_inner();
        assert_eq!(transport.submissions, 1);
        assert_eq!(
            transport.log[0],
            vec![Segment::Write {
                target: 0x50,
                data: vec![0x03, 0x26, 0x57, 0x78],
            }]
        );
    }

    #[test]
    fn test_read_two_byte_offset_layout() {
        let transport = MockTransport::new().with_chip(0x50, 2);
        let mut i2c = I2c::new(transport);
        let mut buf = [0u8; 10];
        i2c.read(0x50, AddressMode::TwoByte, 10, &mut buf).unwrap();

        let transport = i2c.into_inner();
        assert_eq!(transport.submissions, 1);
        assert_eq!(
            transport.log[0],
            vec![
                Segment::Write {
                    target: 0x50,
                    data: vec![0x00, 0x0a],
                },
                Segment::Read {
                    target: 0x50,
                    len: 10,
                },
            ]
        );
    }

    #[test]
    fn test_read_block_bits_go_to_address() {
        // offset 0x012345 on chip 0x50: block bit lands in the address, the
        // data segment carries only the low two offset bytes
        let transport = MockTransport::new().with_chip(0x51, 2);
        let mut i2c = I2c::new(transport);
        let mut buf = [0u8; 4];
        i2c.read(0x50, AddressMode::TwoByte, 0x012345, &mut buf)
            .unwrap();

        let transport = i2c.into_inner();
        assert_eq!(
            transport.log[0],
            vec![
                Segment::Write {
                    target: 0x51,
                    data: vec![0x23, 0x45],
                },
                Segment::Read {
                    target: 0x51,
                    len: 4,
                },
            ]
        );
    }

    #[test]
    fn test_round_trip_mode_none() {
        let transport = MockTransport::new().with_chip(0x30, 0);
        let mut i2c = I2c::new(transport);
        i2c.write(0x30, AddressMode::None, 0, &[0x11, 0x22, 0x33])
            .unwrap();

        let mut buf = [0u8; 3];
        i2c.read(0x30, AddressMode::None, 0, &mut buf).unwrap();
        assert_eq!(buf, [0x11, 0x22, 0x33]);
    }

    #[test]
    fn test_round_trip_one_byte_offset() {
        let transport = MockTransport::new().with_chip(0x50, 1);
        let mut i2c = I2c::new(transport);
        i2c.write(0x50, AddressMode::OneByte, 0x10, &[0xaa, 0xbb])
            .unwrap();

        let mut buf = [0u8; 2];
        i2c.read(0x50, AddressMode::OneByte, 0x10, &mut buf).unwrap();
        assert_eq!(buf, [0xaa, 0xbb]);

        // offsets are honored, not just replayed
        let mut one = [0u8; 1];
        i2c.read(0x50, AddressMode::OneByte, 0x11, &mut one).unwrap();
        assert_eq!(one, [0xbb]);
    }

    #[test]
    fn test_read_recovers_from_transient_failures() {
        let transport = MockTransport::new().with_chip(0x50, 1).failing(3);
        let mut i2c = I2c::new(transport);
        let mut buf = [0u8; 1];
        i2c.read(0x50, AddressMode::OneByte, 0, &mut buf).unwrap();
        assert_eq!(i2c.into_inner().submissions, 4);
    }

    #[test]
    fn test_read_gives_up_after_attempt_budget() {
        let transport = MockTransport::new().failing(u32::MAX);
        let mut i2c = I2c::new(transport);
        let mut buf = [0u8; 1];
        let err = i2c.read(0x50, AddressMode::None, 0, &mut buf).unwrap_err();
        assert!(matches!(err, Error::Transport { attempts: 10, .. }));
        assert_eq!(i2c.into_inner().submissions, 10);
    }

    #[test]
    fn test_write_is_never_retried() {
        let transport = MockTransport::new().failing(1);
        let mut i2c = I2c::new(transport);
        let err = i2c
            .write(0x50, AddressMode::OneByte, 0, &[0x01])
            .unwrap_err();
        assert!(matches!(err, Error::Transport { attempts: 1, .. }));
        assert_eq!(i2c.into_inner().submissions, 1);
    }

    #[test]
    fn test_oversized_write_rejected_before_submission() {
        let transport = MockTransport::new().with_chip(0x50, 1);
        let mut i2c = I2c::new(transport);
        let payload = [0u8; MAX_WRITE_LEN];
        let err = i2c
            .write(0x50, AddressMode::OneByte, 0, &payload)
            .unwrap_err();
        assert!(matches!(err, Error::WriteTooLong { .. }));
        assert_eq!(i2c.into_inner().submissions, 0);

        // without framing bytes the full limit is usable
        let transport = MockTransport::new().with_chip(0x50, 0);
        let mut i2c = I2c::new(transport);
        i2c.write(0x50, AddressMode::None, 0, &payload).unwrap();
    }

    #[test]
    fn test_scan_reports_exactly_the_responders() {
        let transport = MockTransport::new().with_chip(0x50, 0).with_chip(0x68, 0);
        let mut i2c = I2c::new(transport);
        assert_eq!(i2c.scan(), vec![0x50, 0x68]);

        let transport = i2c.into_inner();
        assert!(transport.segments().all(|s| s.target() < 127));
    }

    #[test]
    fn test_probe_single_chip() {
        let transport = MockTransport::new().with_chip(0x68, 0);
        let mut i2c = I2c::new(transport).with_read_attempts(1);
        assert!(i2c.probe(0x68));
        assert!(!i2c.probe(0x50));
    }
}
