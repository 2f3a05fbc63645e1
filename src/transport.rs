use std::io;

use i2c::Message;
use i2cdev::core::{I2CMessage, I2CTransfer};
use i2cdev::linux::{LinuxI2CBus, LinuxI2CMessage};

use crate::{Error, Result};

/// Trait used by `crate::engine` to talk to a bus controller. A submission is
/// one atomic ordered sequence of message segments: either every segment is
/// acknowledged or the whole transaction fails. Can be replaced with
/// `MockTransport` for testing without hardware.
pub trait Transport {
    fn submit(&mut self, messages: &mut [Message]) -> io::Result<()>;
}

/// Transport backed by a `/dev/i2c-N` device node. Segments are issued as one
/// combined transfer, so a write-then-read pair goes out with a repeated
/// start in between rather than a stop.
pub struct LinuxTransport {
    bus: LinuxI2CBus,
}

impl LinuxTransport {
    pub fn open(bus: u32) -> Result<Self> {
        let path = format!("/dev/i2c-{}", bus);
        match LinuxI2CBus::new(&path) {
            Ok(dev) => Ok(Self { bus: dev }),
            Err(e) => Err(Error::BusOpen {
                bus,
                source: io::Error::other(e),
            }),
        }
    }
}

impl Transport for LinuxTransport {
    fn submit(&mut self, messages: &mut [Message]) -> io::Result<()> {
        let mut raw: Vec<LinuxI2CMessage> = messages
            .iter_mut()
            .map(|message| match message {
                Message::Read { address, data, .. } => {
                    LinuxI2CMessage::read(data).with_address(*address)
                }
                Message::Write { address, data, .. } => {
                    LinuxI2CMessage::write(data).with_address(*address)
                }
            })
            .collect();
        self.bus.transfer(&mut raw).map_err(io::Error::other)?;
        Ok(())
    }
}
