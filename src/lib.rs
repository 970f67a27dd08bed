//! Driving a USB JTAG/SPI adapter for Gowin GW1NZ FPGAs.
//!
//! <br>
//!
//! The adapter is a small microcontroller sitting between USB and the FPGA's
//! JTAG pins. It exposes one bulk endpoint pair; every request is a single
//! frame of at most 64 bytes, `[opcode, argument, payload...]`, and requests
//! that produce data are answered with one frame on the IN endpoint. On top
//! of that the microcontroller keeps a control byte (in RAM and in its data
//! flash), a serial number, and can measure the USB bus voltage.
//!
//! Higher level FPGA operations (IDCODE, SRAM erase and programming, CDONE)
//! are built from JTAG instruction shifts and live on the same
//! [`UsbJtag`] type.
//!
//! # Example
//!
//! Load a bitstream into FPGA SRAM!
//!
//! ```rust,no_run
//! use rusb::Context;
//! use usbjtag_rs::{UsbJtag, UsbJtagError, UsbTransport};
//!
//! fn main() -> Result<(), UsbJtagError> {
//!     let ctx = Context::new().map_err(UsbJtagError::DeviceOpenFailed)?;
//!     let transport = UsbTransport::open(ctx, None)?;
//!     let mut jtag = UsbJtag::new(transport);
//!
//!     println!("VBUS: {:.2}V", jtag.read_vbus()?);
//!
//!     let bitstream = std::fs::read("blinky.fs").expect("failed to read bitstream");
//!     let report = jtag.configure_sram(&bitstream)?;
//!     println!(
//!         "{:.2} KiB programmed in {:.2} ms",
//!         report.kib(),
//!         report.elapsed.as_secs_f64() * 1000.0
//!     );
//!     Ok(())
//! }
//! ```

use std::time::Duration;

/// Adapter USB Vendor ID
pub const USBJTAG_VID: u16 = 0x20a0;
/// Adapter USB Product ID
pub const USBJTAG_PID: u16 = 0x4209;
/// Interface holding the bulk endpoints
pub const USBJTAG_IFACE: u8 = 0;
/// Host to device bulk endpoint
pub const USBJTAG_EP_OUT: u8 = 0x01;
/// Device to host bulk endpoint
pub const USBJTAG_EP_IN: u8 = 0x82;
/// Timeout applied to every bulk transfer
pub const USBJTAG_TIMEOUT: Duration = Duration::from_millis(100);

/// Size of a USB frame, in either direction
pub const FRAME_SIZE: usize = 64;
/// Room left for payload after the opcode and argument bytes
pub const MAX_PAYLOAD: usize = FRAME_SIZE - 2;
/// Most TMS/TDI byte pairs in one slow mode shift
pub const JTAG_SLOW_MAX: usize = MAX_PAYLOAD / 2;
/// Most TDI bytes in one fast mode shift
pub const JTAG_FAST_MAX: usize = MAX_PAYLOAD;
/// Most bytes in one SPI transaction
pub const SPI_MAX: usize = MAX_PAYLOAD;

/// Length of the serial number field on the microcontroller
pub const SERIAL_LEN: usize = 16;
/// Volts per LSB of the VBUS reading
pub const VBUS_SCALE: f32 = 0.0258;

/// Command Module
pub mod cmd;
pub use cmd::{ControlBank, Opcode, ResetKind, UsbJtagCmd, UsbJtagError};

/// USB Transport Module
pub mod usb;
pub use usb::{flush_input, Transport, UsbTransport};

/// Command Dispatch Module
pub mod conn;
pub use conn::UsbJtag;

/// Microcontroller Register Module
pub mod mcu;
pub use mcu::McuBackup;

/// JTAG Shift Module
pub mod jtag;

/// FPGA Configuration Module
pub mod fpga;
pub use fpga::ConfigReport;

/// SPI Module
pub mod spi;
