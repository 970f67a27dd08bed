//! usbjtag - command line front end for the USB JTAG adapter

use clap::{Parser, Subcommand, ValueEnum};
use rusb::Context;
use std::path::PathBuf;
use usbjtag_rs::{ControlBank, ResetKind, UsbJtag, UsbJtagError, UsbTransport};

/// Parse a control byte given in hex, with or without a 0x prefix
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex byte: {}", e))
}

/// Split SPI arguments into transactions.
///
/// Bytes are one or two hex digits; a lone `s` ends the current transaction.
fn parse_spi(args: &[String]) -> Result<Vec<Vec<u8>>, String> {
    let mut groups = vec![];
    let mut tx = vec![];

    for arg in args {
        if arg == "s" {
            if !tx.is_empty() {
                groups.push(std::mem::take(&mut tx));
            }
            continue;
        }
        if arg.is_empty() || arg.len() > 2 || !arg.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid byte input: {}", arg));
        }
        let byte =
            u8::from_str_radix(arg, 16).map_err(|_| format!("Invalid byte input: {}", arg))?;
        tx.push(byte);
    }
    if !tx.is_empty() {
        groups.push(tx);
    }

    Ok(groups)
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Parser)]
#[command(name = "usbjtag")]
#[command(author, version, about = "USB JTAG programmer for Gowin GW1NZ FPGAs", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a value from the adapter
    Read { target: ReadTarget },
    /// Write a value to the adapter
    Write { target: WriteTarget, value: String },
    /// Program a bitstream into FPGA SRAM
    Sram { file: PathBuf },
    /// Program a bitstream into FPGA flash
    Flash { file: PathBuf },
    /// Run SPI transactions (hex bytes, `s` separates transactions)
    Spi {
        #[arg(required = true, num_args = 1..)]
        bytes: Vec<String>,
    },
    /// Reset the FPGA
    Reset {
        #[arg(value_enum, default_value_t = ResetArg::Power)]
        kind: ResetArg,
    },
    /// Reboot the adapter microcontroller into its USB bootloader
    Isp,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReadTarget {
    Ctl,
    CtlRom,
    Sn,
    Vbus,
    Error,
    Id,
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum WriteTarget {
    Ctl,
    CtlRom,
    Sn,
}

#[derive(Clone, Copy, ValueEnum)]
enum ResetArg {
    Power,
    User,
}

type Jtag = UsbJtag<UsbTransport<Context>>;

fn open() -> Result<Jtag, UsbJtagError> {
    let ctx = Context::new().map_err(UsbJtagError::DeviceOpenFailed)?;
    Ok(UsbJtag::new(UsbTransport::open(ctx, None)?))
}

fn print_report(report: &usbjtag_rs::ConfigReport) {
    println!(
        "CDONE status: {}",
        if report.cdone { "success" } else { "fail" }
    );
    println!("File size: {:.2} KiB", report.kib());
    println!(
        "Elapsed time: {:.2} ms",
        report.elapsed.as_secs_f64() * 1000.0
    );
    println!("Average bitrate: {:.2} Mbps", report.mbps());
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Read { target } => {
            let mut jtag = open()?;
            match target {
                ReadTarget::Ctl => println!("CTL: {:02x}", jtag.read_control(ControlBank::Ram)?),
                ReadTarget::CtlRom => {
                    println!("CTL_ROM: {:02x}", jtag.read_control(ControlBank::Rom)?)
                }
                ReadTarget::Sn => println!("SN: {}", jtag.read_serial()?),
                ReadTarget::Vbus => println!("VBUS: {:.2}V", jtag.read_vbus()?),
                ReadTarget::Error => println!("ERR: {:02x}", jtag.read_error_status()?),
                ReadTarget::Id => {
                    jtag.tap_reset()?;
                    println!("JTAG ID: {}", jtag.read_id()?)
                }
                ReadTarget::Status => {
                    jtag.tap_reset()?;
                    println!("STATUS: {:08x}", jtag.read_status()?)
                }
            }
        }
        Commands::Write { target, value } => {
            let bank = match target {
                WriteTarget::Ctl => Some(ControlBank::Ram),
                WriteTarget::CtlRom => Some(ControlBank::Rom),
                WriteTarget::Sn => None,
            };
            let byte = bank.map(|_| parse_hex_u8(&value)).transpose()?;

            let mut jtag = open()?;
            match (bank, byte) {
                (Some(bank), Some(byte)) => jtag.write_control(bank, byte)?,
                _ => jtag.write_serial(&value)?,
            }
        }
        Commands::Sram { file } => {
            let bitstream = std::fs::read(&file)?;
            let mut jtag = open()?;
            let report = jtag.load_sram(&bitstream)?;
            println!("JTAG ID: {}", report.id);
            print_report(&report);
            if !report.cdone {
                return Err(UsbJtagError::ConfigurationCorrupted.into());
            }
        }
        Commands::Flash { file } => {
            let bitstream = std::fs::read(&file)?;
            let mut jtag = open()?;
            let report = jtag.configure_flash(&bitstream)?;
            print_report(&report);
        }
        Commands::Spi { bytes } => {
            let groups = parse_spi(&bytes)?;
            let mut jtag = open()?;
            let mut rx = vec![];
            for tx in &groups {
                rx.push(jtag.spi_write_read(tx)?);
            }
            for tx in &groups {
                println!("Transmitted bytes: {}", hex_bytes(tx));
            }
            for rx in &rx {
                println!("Received    bytes: {}", hex_bytes(rx));
            }
        }
        Commands::Reset { kind } => {
            let kind = match kind {
                ResetArg::Power => ResetKind::Power,
                ResetArg::User => ResetKind::User,
            };
            open()?.fpga_reset(kind)?;
        }
        Commands::Isp => {
            let mut jtag = open()?;
            let backup = jtag.backup_mcu()?;
            log::info!(
                "ctl_rom={:02x} sn={:?}, restore after flashing with `usbjtag write`",
                backup.ctl_rom,
                backup.serial
            );
            jtag.reset_to_bootloader();
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Set log level based on verbosity, RUST_LOG still wins
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
