mod engine;
mod error;
mod framing;
mod transport;


pub use engine::*;
pub use error::*;
pub use framing::{AddressMode, MAX_WRITE_LEN};
pub use transport::{LinuxTransport, Transport};
pub use i2c;
