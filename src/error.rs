use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("address length must be 0, 1 or 2 (got {0})")]
    InvalidAddressMode(u8),

    #[error(
        "write of {payload} payload byte(s) plus {framing} framing byte(s) exceeds the \
         {limit}-byte transfer limit"
    )]
    WriteTooLong {
        payload: usize,
        framing: usize,
        limit: usize,
    },

    #[error("failed to open bus {bus}")]
    BusOpen {
        bus: u32,
        #[source]
        source: io::Error,
    },

    #[error("bus transaction failed after {attempts} attempt(s)")]
    Transport {
        attempts: u32,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
