use thiserror::Error;

use crate::{FRAME_SIZE, MAX_PAYLOAD};

/// Error type for this crate.
#[derive(Error, Debug)]
pub enum UsbJtagError {
    /// USB device not found.
    #[error("usb device not found")]
    DeviceNotFound,
    /// Failed to open, claim or configure the USB device.
    #[error("failed to open usb device: {0}")]
    DeviceOpenFailed(rusb::Error),
    /// Transfer attempted on a closed device handle.
    #[error("usb device is closed")]
    DeviceClosed,
    /// USB bulk transfer did not complete within the timeout.
    #[error("usb transfer timed out")]
    TransportTimeout,
    /// USB bulk transfer failed.
    #[error("usb transfer failed: {0}")]
    TransportIo(rusb::Error),

    /// Command payload does not fit in a single frame.
    #[error("frame payload of {0} bytes exceeds 62 bytes")]
    InvalidFrameLength(usize),
    /// Input length is outside of the range accepted by the command.
    #[error("invalid input length")]
    InvalidLength,
    /// Input value is outside of the range accepted by the command.
    #[error("value out of bound")]
    ValueOutOfBound,
    /// Device answered with a response of the wrong size.
    #[error("invalid response length: expected {expected}, got {actual}")]
    UnexpectedResponseLength { expected: usize, actual: usize },

    /// CDONE was not set after programming a bitstream.
    #[error("bitstream corrupted, cdone not set after configuration")]
    ConfigurationCorrupted,
    /// Operation is not supported by this driver.
    #[error("function not implemented")]
    NotImplemented,
}

impl From<rusb::Error> for UsbJtagError {
    fn from(e: rusb::Error) -> Self {
        match e {
            rusb::Error::Timeout => UsbJtagError::TransportTimeout,
            e => UsbJtagError::TransportIo(e),
        }
    }
}

pub type Result<T> = ::std::result::Result<T, UsbJtagError>;

/// Top level command groups, the first byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Microcontroller housekeeping and FPGA power control.
    Mcu = 0x00,
    /// JTAG shifts.
    Jtag = 0x01,
    /// SPI transactions.
    Spi = 0x02,
}

/// Sub-opcodes of [`Opcode::Mcu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum McuCmd {
    FpgaReset = 0x00,
    ReadControl = 0x01,
    WriteControl = 0x02,
    ReadVbus = 0x03,
    Delay = 0x04,
    ReadError = 0x05,
    ReadSerial = 0xfd,
    WriteSerial = 0xfe,
    ResetIsp = 0xff,
}

/// Sub-opcodes of [`Opcode::Jtag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JtagCmd {
    Write = 0x00,
    WriteRead = 0x01,
    FastWrite = 0x02,
    FastWriteRead = 0x03,
}

/// Sub-opcodes of [`Opcode::Spi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpiCmd {
    Write = 0x00,
    WriteRead = 0x01,
}

impl TryFrom<u8> for Opcode {
    type Error = ();

    fn try_from(x: u8) -> std::result::Result<Self, Self::Error> {
        match x {
            x if x == Self::Mcu as u8 => Ok(Self::Mcu),
            x if x == Self::Jtag as u8 => Ok(Self::Jtag),
            x if x == Self::Spi as u8 => Ok(Self::Spi),
            _ => Err(()),
        }
    }
}

/// Control byte bank on the microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlBank {
    /// Volatile copy, lost on power cycle.
    Ram = 0x00,
    /// Persistent copy, loaded into RAM at boot.
    Rom = 0x01,
}

/// Kind of FPGA reset asserted by the microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResetKind {
    /// Cycle the FPGA core supply.
    Power = 0x00,
    /// Pulse RECONFIG_N.
    User = 0x01,
}

/// Single USB frame sent to the adapter.
///
/// Layout is `[opcode, argument, payload...]`, never longer than
/// [`FRAME_SIZE`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbJtagCmd {
    opcode: u8,
    arg: u8,
    payload: Vec<u8>,
}

impl UsbJtagCmd {
    /// Creates a new frame, rejecting payloads that do not fit.
    pub fn new(opcode: u8, arg: u8, payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD {
            return Err(UsbJtagError::InvalidFrameLength(payload.len()));
        }
        Ok(UsbJtagCmd {
            opcode,
            arg,
            payload: payload.to_vec(),
        })
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn arg(&self) -> u8 {
        self.arg
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serializes the frame to the bytes put on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FRAME_SIZE);
        buf.push(self.opcode);
        buf.push(self.arg);
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Extracts a 32-bit register from a 6-byte JTAG read.
///
/// The adapter clocks the register out last byte first with a status byte
/// in front, so the response is reversed and index 0 dropped.
pub fn decode_register(resp: &[u8]) -> Result<[u8; 4]> {
    if resp.len() != 6 {
        return Err(UsbJtagError::UnexpectedResponseLength {
            expected: 6,
            actual: resp.len(),
        });
    }
    let mut rev = resp.to_vec();
    rev.reverse();
    Ok([rev[1], rev[2], rev[3], rev[4]])
}

/// Lowercase hex rendering used for the FPGA ID.
pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
