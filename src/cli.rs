use std::time::Duration;

use anyhow::Context;
use log::{error, info};
use structopt::StructOpt;

use opup_prog::qspi::{EraseGranularity, FlashEngine, Vendor};
use opup_prog::{Error, SerialTransport, Session};

#[derive(Debug, StructOpt)]
struct Options {
    #[structopt(subcommand)]
    operation: Operations,

    /// Serial port the programmer is attached to
    #[structopt(short = "p", long, default_value = "/dev/ttyACM0")]
    port: String,

    /// Serial baud rate
    #[structopt(short = "b", long, default_value = "115200")]
    baud: u32,

    /// Per-read timeout, in seconds
    #[structopt(short = "t", long, default_value = "2.0")]
    timeout: f64,

    /// Enable debug-level logging
    #[structopt(short = "v", long)]
    verbose: bool,
}

#[derive(Debug, StructOpt)]
enum Operations {
    /// Ping the programmer
    Ping,
    /// Read device status
    Status,
    /// Read the debug GPIO state
    GpioTest,
    /// Scan the I2C bus
    I2cScan,
    /// Scan for an attached SPI flash chip
    SpiScan,
    /// Clock `hex` out over raw SPI and print what comes back
    SpiRaw { hex: String },
    /// Alias for `spi-scan`
    SpiJedec,
    /// Switch the QSPI lane mode (0-5)
    QspiMode { mode: u8 },
    /// Read `len` bytes at `addr` using the current mode
    QspiRead { addr: String, len: u16 },
    /// Fast-read `pages` 256-byte pages starting at `addr`
    QspiFastRead {
        addr: String,
        #[structopt(default_value = "1")]
        pages: u8,
    },
    /// Issue a raw QSPI command, optionally clocking `hex` out afterward
    QspiCmd {
        cmd: String,
        #[structopt(default_value = "")]
        hex: String,
    },
    /// Run the erase/program/read-back verification routine
    QspiTest {
        #[structopt(default_value = "0x100000")]
        addr: String,
    },
    /// Enable the Quad-Enable bit for the identified vendor
    QspiQuadEnable,
    /// Print the SR1/SR2 status registers
    QspiStatus,
    /// Read `len` bytes of flash at `addr`
    FlashRead {
        addr: String,
        #[structopt(default_value = "256")]
        len: u16,
    },
    /// Write `hex` to flash at `addr`
    FlashWrite { addr: String, hex: String },
    /// Erase flash at `addr` with the given granularity
    FlashErase {
        addr: String,
        #[structopt(default_value = "sector")]
        granularity: String,
        /// Required literal "YES" to confirm a chip erase
        #[structopt(default_value = "")]
        confirm: String,
    },
    /// Run the multi-mode read benchmark
    FlashBenchmark {
        #[structopt(default_value = "1")]
        size_kb: u16,
        #[structopt(default_value = "0x100000")]
        addr: String,
    },
    /// Read the AVR ISP signature bytes
    AvrSig,
    /// Enter AVR ISP mode
    IspEnter,
    /// Exit AVR ISP mode
    IspExit,
}

fn parse_addr(s: &str) -> Result<u32, std::num::ParseIntError> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(s, 16)
}

fn run(opts: &Options, session: &mut Session<SerialTransport>) -> Result<(), Error> {
    match &opts.operation {
        Operations::Ping => {
            let ok = session.ping()?;
            println!("ping: {}", if ok { "ok" } else { "unexpected reply" });
        }
        Operations::Status => {
            let status = session.get_status()?;
            println!("{:?}", status);
        }
        Operations::GpioTest => {
            let gpio = session.gpio_test()?;
            println!("{:?}", gpio);
        }
        Operations::I2cScan => {
            let addrs = session.i2c_scan()?;
            println!("found {} device(s): {:02x?}", addrs.len(), addrs);
        }
        Operations::SpiScan | Operations::SpiJedec => match session.spi_scan()? {
            Some((mfg, hi, lo)) => {
                println!("manufacturer {:#04x}, device {:#06x}", mfg, ((hi as u16) << 8) | lo as u16)
            }
            None => println!("no device found"),
        },
        Operations::SpiRaw { hex: tx_hex } => {
            let tx = hex::decode(tx_hex).map_err(|e| Error::OperationFailed(e.to_string()))?;
            let rx = session.spi_xfer(&tx)?;
            println!("{}", hex::encode(rx));
        }
        Operations::QspiMode { mode } => {
            let now = session.qspi_set_mode(*mode)?;
            println!("mode now {}", now);
        }
        Operations::QspiRead { addr, len } => {
            let addr = parse_addr(addr).map_err(|e| Error::OperationFailed(e.to_string()))?;
            let data = session.qspi_read(0x03, addr, 3, 0, *len)?;
            println!("{}", hex::encode(data));
        }
        Operations::QspiFastRead { addr, pages } => {
            let addr = parse_addr(addr).map_err(|e| Error::OperationFailed(e.to_string()))?;
            let data = session.qspi_fast_read(addr, *pages)?;
            println!("{}", hex::encode(data));
        }
        Operations::QspiCmd { cmd, hex: tx_hex } => {
            let cmd = parse_addr(cmd).map_err(|e| Error::OperationFailed(e.to_string()))? as u8;
            let tx = hex::decode(tx_hex).map_err(|e| Error::OperationFailed(e.to_string()))?;
            let rx = session.qspi_cmd(cmd, &tx)?;
            println!("{}", hex::encode(rx));
        }
        Operations::QspiTest { addr } => {
            let addr = parse_addr(addr).map_err(|e| Error::OperationFailed(e.to_string()))?;
            let mut engine = FlashEngine::new(session);
            let pattern: Vec<u8> = (0..=255u8).collect();
            let report = engine.verify_write(addr, &pattern)?;
            if report.is_ok() {
                println!("qspi-test: {} bytes verified ok", report.bytes_checked);
            } else {
                println!(
                    "qspi-test: mismatch at offset {}",
                    report.first_mismatch.unwrap()
                );
            }
        }
        Operations::QspiQuadEnable => {
            let mut engine = FlashEngine::new(session);
            let ident = engine.identify()?;
            engine.quad_enable(Vendor::from(ident))?;
            println!("quad-enable: done for {}", ident.manufacturer_name());
        }
        Operations::QspiStatus => {
            let mut engine = FlashEngine::new(session);
            let sr1 = engine.read_sr1()?;
            let sr2 = engine.read_sr2()?;
            println!("SR1={:#04x} SR2={:#04x}", sr1.bits(), sr2.bits());
        }
        Operations::FlashRead { addr, len } => {
            let addr = parse_addr(addr).map_err(|e| Error::OperationFailed(e.to_string()))?;
            let mut engine = FlashEngine::new(session);
            let data = engine.read(addr, *len)?;
            println!("{}", hex::encode(data));
        }
        Operations::FlashWrite { addr, hex: data_hex } => {
            let addr = parse_addr(addr).map_err(|e| Error::OperationFailed(e.to_string()))?;
            let data = hex::decode(data_hex).map_err(|e| Error::OperationFailed(e.to_string()))?;
            let mut engine = FlashEngine::new(session);
            engine.write(addr, &data)?;
            println!("wrote {} bytes at {:#08x}", data.len(), addr);
        }
        Operations::FlashErase {
            addr,
            granularity,
            confirm,
        } => {
            let addr = parse_addr(addr).map_err(|e| Error::OperationFailed(e.to_string()))?;
            let granularity = match granularity.as_str() {
                "sector" => EraseGranularity::Sector4K,
                "block32" => EraseGranularity::Block32K,
                "block64" => EraseGranularity::Block64K,
                "chip" => EraseGranularity::Chip,
                other => {
                    return Err(Error::OperationFailed(format!(
                        "unknown erase granularity {other:?}"
                    )))
                }
            };
            if granularity == EraseGranularity::Chip && confirm != "YES" {
                return Err(Error::OperationFailed(
                    "chip erase requires confirmation literal YES".into(),
                ));
            }
            let mut engine = FlashEngine::new(session);
            engine.erase(granularity, addr)?;
            println!("erase complete");
        }
        Operations::FlashBenchmark { size_kb, addr } => {
            let addr = parse_addr(addr).map_err(|e| Error::OperationFailed(e.to_string()))?;
            let mut engine = FlashEngine::new(session);
            let results = engine.benchmark(addr, *size_kb * 1024)?;
            for r in results {
                match &r.error {
                    Some(e) => println!("mode {}: failed ({e})", r.mode),
                    None => println!(
                        "mode {}: {} bytes in {:?} ({:.0} B/s)",
                        r.mode,
                        r.bytes_read,
                        r.elapsed,
                        r.bytes_per_second()
                    ),
                }
            }
        }
        Operations::AvrSig => {
            let (a, b, c) = session.avr_signature()?;
            println!("signature: {:02x} {:02x} {:02x}", a, b, c);
        }
        Operations::IspEnter => {
            let ok = session.isp_enter()?;
            println!("isp-enter: {}", if ok { "ok" } else { "device declined" });
        }
        Operations::IspExit => {
            session.isp_exit()?;
            println!("isp-exit: ok");
        }
    }
    Ok(())
}

fn main() {
    let opts = Options::from_args();

    let level = if opts.verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
    )
    .unwrap();

    let timeout = Duration::from_secs_f64(opts.timeout);
    let transport = match SerialTransport::open(&opts.port, opts.baud, timeout)
        .map_err(anyhow::Error::from)
        .with_context(|| format!("opening {}", opts.port))
    {
        Ok(t) => t,
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    };
    let mut session = Session::new(transport, opts.port.clone());
    info!("connected to {}", opts.port);

    if let Err(e) = run(&opts, &mut session) {
        error!("{e}");
    }
}
