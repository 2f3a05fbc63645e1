//! Translates a (chip address, address length, offset) triple into the
//! message layout expected by the device: which target address goes on the
//! wire and which offset bytes are sent in-band before the data transfer.

use crate::{Error, Result};

/// Largest combined framing-plus-payload length accepted for a single write
/// segment.
pub const MAX_WRITE_LEN: usize = 256;

/// How many in-band offset bytes precede a data transfer, and whether offset
/// bits extend into the device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    /// No offset; the chip streams data from a fixed register.
    None,
    /// One offset byte sent in-band before the data, as small EEPROMs expect.
    OneByte,
    /// Two offset bytes sent in-band; offset bits 16..24 are OR'd into the
    /// chip address to select a 64 KiB block. Models chips that extend their
    /// addressable range by stealing address pins.
    TwoByte,
}

impl AddressMode {
    /// Maps a numeric address length (as given on the command line) to a
    /// mode. Anything outside 0..=2 is rejected.
    pub fn from_len(len: u8) -> Result<Self> {
        match len {
            0 => Ok(AddressMode::None),
            1 => Ok(AddressMode::OneByte),
            2 => Ok(AddressMode::TwoByte),
            n => Err(Error::InvalidAddressMode(n)),
        }
    }

    /// Number of offset bytes sent in-band before the data.
    pub fn offset_bytes(self) -> usize {
        match self {
            AddressMode::None => 0,
            AddressMode::OneByte => 1,
            AddressMode::TwoByte => 2,
        }
    }
}

/// Wire layout for one transfer: the effective target address and the offset
/// bytes that go out before any payload. For a write the prefix and payload
/// share one segment; for a read the prefix becomes a leading write segment
/// of the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Framing {
    target: u16,
    prefix: [u8; 2],
    prefix_len: usize,
}

impl Framing {
    pub fn new(chip: u8, mode: AddressMode, offset: u32) -> Self {
        match mode {
            AddressMode::None => Framing {
                target: chip as u16,
                prefix: [0; 2],
                prefix_len: 0,
            },
            AddressMode::OneByte => Framing {
                target: chip as u16,
                prefix: [offset as u8, 0],
                prefix_len: 1,
            },
            AddressMode::TwoByte => Framing {
                // the block number rides on the address lines, not in the data
                target: (chip | (offset >> 16) as u8) as u16,
                prefix: [(offset >> 8) as u8, offset as u8],
                prefix_len: 2,
            },
        }
    }

    pub fn target(&self) -> u16 {
        self.target
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix[..self.prefix_len]
    }
}
