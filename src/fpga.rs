//! Gowin configuration sequences.
//!
//! The FPGA's configuration engine is driven by loading 8-bit instructions
//! into the TAP instruction register. The command values and their order
//! come from the vendor's programming flow and must not be rearranged.

use crate::cmd::{decode_register, hex_string, ResetKind, Result, UsbJtagError};
use crate::conn::UsbJtag;
use crate::usb::Transport;
use crate::JTAG_FAST_MAX;

use log::debug;
use std::time::{Duration, Instant};

/// IDCODE register.
pub const GW_REG_ID: u8 = 0x11;
/// Status register, holds CDONE.
pub const GW_REG_STATUS: u8 = 0x41;

pub const GW_CMD_CONFIG_ENABLE: u8 = 0x15;
pub const GW_CMD_ERASE_SRAM: u8 = 0x05;
pub const GW_CMD_NOOP: u8 = 0x02;
pub const GW_CMD_XFER_DONE: u8 = 0x09;
pub const GW_CMD_CONFIG_DISABLE: u8 = 0x3a;
pub const GW_CMD_INIT_ADDR: u8 = 0x12;
pub const GW_CMD_XFER_WRITE: u8 = 0x17;

/// CDONE bit in byte 2 of the status register.
pub const GW_STATUS_CDONE: u8 = 0x20;

const TMS_IR_SCAN: [u8; 3] = [0x30, 0x80, 0x01];
const TMS_DR_READ: [u8; 6] = [0x20, 0x00, 0x00, 0x00, 0x80, 0x01];

/// Whether a status register value reports a finished configuration.
pub fn cdone(status: &[u8; 4]) -> bool {
    status[2] & GW_STATUS_CDONE != 0
}

/// Outcome of a full configuration run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigReport {
    /// FPGA ID read before programming, as lowercase hex.
    pub id: String,
    /// Bitstream bytes shifted into the device.
    pub bytes: usize,
    /// Time spent shifting the bitstream.
    pub elapsed: Duration,
    /// CDONE as read back after programming.
    pub cdone: bool,
}

impl ConfigReport {
    pub fn kib(&self) -> f64 {
        self.bytes as f64 / 1024.0
    }

    /// Average throughput in Mbit/s.
    pub fn mbps(&self) -> f64 {
        let ms = self.elapsed.as_secs_f64() * 1000.0;
        if ms == 0.0 {
            return 0.0;
        }
        self.bytes as f64 / 125.0 / ms
    }
}

impl<B: Transport> UsbJtag<B> {
    /// Forces the TAP into Test-Logic-Reset.
    pub fn tap_reset(&mut self) -> Result<()> {
        self.jtag_write(&[0xff], &[0x00])
    }

    /// Loads `cmd` into the instruction register and returns to idle.
    pub fn write_cmd(&mut self, cmd: u8) -> Result<()> {
        self.jtag_write(&TMS_IR_SCAN, &[0x00, cmd, 0x00])
    }

    /// Selects register `reg` and shifts its 32-bit value out.
    pub fn read_reg(&mut self, reg: u8) -> Result<[u8; 4]> {
        self.write_cmd(reg)?;
        let resp = self.jtag_write_read(&TMS_DR_READ, &[0x00; 6])?;
        decode_register(&resp)
    }

    /// FPGA ID as eight lowercase hex digits.
    pub fn read_id(&mut self) -> Result<String> {
        Ok(hex_string(&self.read_reg(GW_REG_ID)?))
    }

    pub fn read_id_code(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_reg(GW_REG_ID)?))
    }

    pub fn read_status(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_reg(GW_REG_STATUS)?))
    }

    pub fn read_cdone(&mut self) -> Result<bool> {
        Ok(cdone(&self.read_reg(GW_REG_STATUS)?))
    }

    /// Erases the configuration SRAM.
    pub fn reset_sram(&mut self) -> Result<()> {
        debug!("erasing sram");
        self.write_cmd(GW_CMD_CONFIG_ENABLE)?;
        self.write_cmd(GW_CMD_ERASE_SRAM)?;
        self.write_cmd(GW_CMD_NOOP)?;
        self.delay(10, 0)?;
        self.write_cmd(GW_CMD_XFER_DONE)?;
        self.write_cmd(GW_CMD_CONFIG_DISABLE)?;
        self.write_cmd(GW_CMD_NOOP)
    }

    /// Shifts `bitstream` into configuration SRAM and returns the number of
    /// bytes written.
    ///
    /// Does not check CDONE, use [`UsbJtag::read_cdone`] afterwards or
    /// [`UsbJtag::configure_sram`] for the whole flow.
    pub fn program_sram(&mut self, bitstream: &[u8]) -> Result<usize> {
        self.write_cmd(GW_CMD_CONFIG_ENABLE)?;
        self.write_cmd(GW_CMD_INIT_ADDR)?;
        self.write_cmd(GW_CMD_XFER_WRITE)?;
        // Run-Test/Idle -> Shift-DR
        self.jtag_write(&[0x20], &[0x00])?;

        for chunk in bitstream.chunks(JTAG_FAST_MAX) {
            self.jtag_write_fast(chunk)?;
        }

        // Shift-DR -> Run-Test/Idle
        self.jtag_write(&[0x03], &[0x00])?;
        self.write_cmd(GW_CMD_CONFIG_DISABLE)?;
        self.write_cmd(GW_CMD_NOOP)?;

        debug!("shifted {} bytes into sram", bitstream.len());
        Ok(bitstream.len())
    }

    /// Embedded flash programming is not supported by the adapter protocol.
    pub fn program_flash(&mut self, _bitstream: &[u8]) -> Result<usize> {
        Err(UsbJtagError::NotImplemented)
    }

    /// Power cycles the FPGA and loads `bitstream` into SRAM.
    ///
    /// CDONE is read back into the report but not acted on; a clear bit is
    /// only an error through [`UsbJtag::configure_sram`].
    pub fn load_sram(&mut self, bitstream: &[u8]) -> Result<ConfigReport> {
        self.fpga_reset(ResetKind::Power)?;
        self.tap_reset()?;
        self.reset_sram()?;

        let id = self.read_id()?;
        debug!("JTAG ID: {}", id);

        let start = Instant::now();
        let bytes = self.program_sram(bitstream)?;
        let elapsed = start.elapsed();

        let cdone = self.read_cdone()?;

        Ok(ConfigReport {
            id,
            bytes,
            elapsed,
            cdone,
        })
    }

    /// Power cycles the FPGA, loads `bitstream` into SRAM and verifies CDONE.
    pub fn configure_sram(&mut self, bitstream: &[u8]) -> Result<ConfigReport> {
        let report = self.load_sram(bitstream)?;
        if !report.cdone {
            return Err(UsbJtagError::ConfigurationCorrupted);
        }
        Ok(report)
    }

    /// Flash counterpart of [`UsbJtag::configure_sram`]; always fails with
    /// [`UsbJtagError::NotImplemented`] before touching the device.
    pub fn configure_flash(&mut self, _bitstream: &[u8]) -> Result<ConfigReport> {
        Err(UsbJtagError::NotImplemented)
    }
}
