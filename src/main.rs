//! i2ct - raw read/write/scan access to Linux I2C buses.
//!
//! A thin command-line front end over the `i2ct` library: `read` and `write`
//! issue single framed transactions against `/dev/i2c-N`, `probe` scans a bus
//! (or checks one address) for responding chips.

use clap::{Parser, Subcommand};
use i2ct::{AddressMode, Error, I2c, LinuxTransport};

const EXIT_USAGE: i32 = 2;
const EXIT_BUS_OPEN: i32 = 3;
const EXIT_WRITE: i32 = 4;
const EXIT_READ: i32 = 5;

/// Parse a string as a hex or decimal u32
fn parse_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal byte value
fn parse_byte(s: &str) -> Result<u8, String> {
    let value = parse_u32(s)?;
    u8::try_from(value).map_err(|_| format!("Value {} does not fit in a byte", value))
}

/// Parse a 7-bit chip address
fn parse_chip(s: &str) -> Result<u8, String> {
    let value = parse_u32(s)?;
    if value > 0x7f {
        return Err(format!("Chip address 0x{:x} exceeds the 7-bit space", value));
    }
    Ok(value as u8)
}

#[derive(Parser)]
#[command(name = "i2ct")]
#[command(version, about = "Raw read/write/scan access to I2C buses", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read bytes from a chip and print them as hex
    Read {
        /// Bus number (/dev/i2c-<bus>)
        #[arg(value_parser = parse_u32)]
        bus: u32,

        /// 7-bit chip address (e.g. 0x50)
        #[arg(value_parser = parse_chip)]
        chip: u8,

        /// Address length: how many offset bytes the chip expects (0, 1 or 2)
        #[arg(value_parser = parse_byte)]
        addr_len: u8,

        /// Offset inside the chip
        #[arg(value_parser = parse_u32)]
        offset: u32,

        /// Number of bytes to read
        #[arg(default_value = "1", value_parser = parse_u32)]
        length: u32,
    },

    /// Write bytes to a chip
    Write {
        /// Bus number (/dev/i2c-<bus>)
        #[arg(value_parser = parse_u32)]
        bus: u32,

        /// 7-bit chip address (e.g. 0x50)
        #[arg(value_parser = parse_chip)]
        chip: u8,

        /// Address length: how many offset bytes the chip expects (0, 1 or 2)
        #[arg(value_parser = parse_byte)]
        addr_len: u8,

        /// Offset inside the chip
        #[arg(value_parser = parse_u32)]
        offset: u32,

        /// Number of bytes to write; missing trailing bytes are zero
        #[arg(value_parser = parse_u32)]
        length: u32,

        /// Data bytes
        #[arg(value_parser = parse_byte)]
        data: Vec<u8>,
    },

    /// Scan a bus for responding chips, or probe a single address
    Probe {
        /// Bus number (/dev/i2c-<bus>)
        #[arg(value_parser = parse_u32)]
        bus: u32,

        /// Probe only this address instead of scanning the whole bus
        #[arg(value_parser = parse_chip)]
        chip: Option<u8>,
    },
}

fn report(err: &Error) {
    eprint!("error: {}", err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        eprint!(": {}", cause);
        source = cause.source();
    }
    eprintln!();
}

fn open_bus(bus: u32) -> Result<I2c<LinuxTransport>, i32> {
    I2c::open(bus).map_err(|e| {
        report(&e);
        EXIT_BUS_OPEN
    })
}

fn run(command: Commands) -> i32 {
    match command {
        Commands::Read {
            bus,
            chip,
            addr_len,
            offset,
            length,
        } => {
            let mode = match AddressMode::from_len(addr_len) {
                Ok(mode) => mode,
                Err(e) => {
                    report(&e);
                    return EXIT_USAGE;
                }
            };
            let mut i2c = match open_bus(bus) {
                Ok(i2c) => i2c,
                Err(code) => return code,
            };
            let mut buf = vec![0u8; length as usize];
            if let Err(e) = i2c.read(chip, mode, offset, &mut buf) {
                report(&e);
                return EXIT_READ;
            }
            let hex: Vec<String> = buf.iter().map(|b| format!("0x{:02x}", b)).collect();
            println!("{}", hex.join(" "));
            0
        }

        Commands::Write {
            bus,
            chip,
            addr_len,
            offset,
            length,
            data,
        } => {
            let mode = match AddressMode::from_len(addr_len) {
                Ok(mode) => mode,
                Err(e) => {
                    report(&e);
                    return EXIT_USAGE;
                }
            };
            if data.len() > length as usize {
                eprintln!(
                    "error: {} data byte(s) given but length is {}",
                    data.len(),
                    length
                );
                return EXIT_USAGE;
            }
            let mut payload = data;
            payload.resize(length as usize, 0);

            let mut i2c = match open_bus(bus) {
                Ok(i2c) => i2c,
                Err(code) => return code,
            };
            if let Err(e) = i2c.write(chip, mode, offset, &payload) {
                report(&e);
                return EXIT_WRITE;
            }
            0
        }

        Commands::Probe { bus, chip } => {
            let mut i2c = match open_bus(bus) {
                Ok(i2c) => i2c,
                Err(code) => return code,
            };
            let responders = match chip {
                Some(addr) => {
                    if i2c.probe(addr) {
                        vec![addr]
                    } else {
                        Vec::new()
                    }
                }
                None => i2c.scan(),
            };
            for addr in responders {
                println!("chip 0x{:02x} is on bus {}", addr, bus);
            }
            0
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    std::process::exit(run(cli.command));
}
