use crate::cmd::{ControlBank, McuCmd, Opcode, ResetKind, Result, UsbJtagError};
use crate::conn::UsbJtag;
use crate::usb::Transport;
use crate::{SERIAL_LEN, VBUS_SCALE};

use log::{debug, warn};

/// Microcontroller state that survives a firmware update only if the host
/// saves and restores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McuBackup {
    /// Persistent control byte.
    pub ctl_rom: u8,
    /// Serial number string.
    pub serial: String,
}

/// Converts a raw VBUS ADC reading to volts.
pub fn vbus_volts(raw: u8) -> f32 {
    raw as f32 * VBUS_SCALE
}

fn delay_args(ms: u32, us: u32) -> Result<(u8, u8)> {
    let ms = u8::try_from(ms).map_err(|_| UsbJtagError::ValueOutOfBound)?;
    let us = u8::try_from(us).map_err(|_| UsbJtagError::ValueOutOfBound)?;
    Ok((ms, us))
}

impl<B: Transport> UsbJtag<B> {
    fn mcu_send(&mut self, cmd: McuCmd, payload: &[u8]) -> Result<()> {
        self.send(Opcode::Mcu as u8, cmd as u8, payload)
    }

    fn mcu_call(&mut self, cmd: McuCmd, payload: &[u8], expected: usize) -> Result<Vec<u8>> {
        self.call(Opcode::Mcu as u8, cmd as u8, payload, Some(expected))
    }

    /// Resets the FPGA, either by power cycling it or through RECONFIG_N.
    pub fn fpga_reset(&mut self, kind: ResetKind) -> Result<()> {
        debug!("fpga reset ({:?})", kind);
        self.mcu_send(McuCmd::FpgaReset, &[kind as u8])
    }

    pub fn read_control(&mut self, bank: ControlBank) -> Result<u8> {
        Ok(self.mcu_call(McuCmd::ReadControl, &[bank as u8], 1)?[0])
    }

    /// Writes the control byte. A ROM write also updates the RAM copy so the
    /// new value applies without a power cycle.
    pub fn write_control(&mut self, bank: ControlBank, value: u8) -> Result<()> {
        if bank == ControlBank::Rom {
            self.mcu_send(McuCmd::WriteControl, &[ControlBank::Rom as u8, value])?;
        }
        self.mcu_send(McuCmd::WriteControl, &[ControlBank::Ram as u8, value])
    }

    /// Raw VBUS ADC reading, see [`vbus_volts`].
    pub fn read_vbus_raw(&mut self) -> Result<u8> {
        Ok(self.mcu_call(McuCmd::ReadVbus, &[], 1)?[0])
    }

    /// USB bus voltage in volts.
    pub fn read_vbus(&mut self) -> Result<f32> {
        self.read_vbus_raw().map(vbus_volts)
    }

    /// Busy-waits on the microcontroller for `ms` milliseconds plus `us`
    /// microseconds. Both must fit in a byte.
    pub fn delay(&mut self, ms: u32, us: u32) -> Result<()> {
        let (ms, us) = delay_args(ms, us)?;
        self.mcu_send(McuCmd::Delay, &[0x00, ms, us])
    }

    /// Holds TCK for `ms` milliseconds plus `us` microseconds.
    pub fn pulse_tck(&mut self, ms: u32, us: u32) -> Result<()> {
        let (ms, us) = delay_args(ms, us)?;
        self.mcu_send(McuCmd::Delay, &[0x01, ms, us])
    }

    pub fn read_error_status(&mut self) -> Result<u8> {
        Ok(self.mcu_call(McuCmd::ReadError, &[], 1)?[0])
    }

    pub fn read_serial(&mut self) -> Result<String> {
        let raw = self.mcu_call(McuCmd::ReadSerial, &[], SERIAL_LEN)?;
        let bytes: Vec<u8> = raw.into_iter().filter(|&b| b != 0).collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Stores a serial number of 1 to 16 bytes. The device pads it with
    /// zeros.
    pub fn write_serial(&mut self, serial: &str) -> Result<()> {
        if serial.is_empty() || serial.len() > SERIAL_LEN {
            return Err(UsbJtagError::InvalidLength);
        }
        self.mcu_send(McuCmd::WriteSerial, serial.as_bytes())
    }

    /// Reboots the microcontroller into its USB bootloader.
    ///
    /// The device detaches while handling the request, so a failed write is
    /// logged and otherwise ignored.
    pub fn reset_to_bootloader(&mut self) {
        if let Err(e) = self.mcu_send(McuCmd::ResetIsp, &[]) {
            warn!("reset to bootloader: {}", e);
        }
    }

    /// Reads the state to carry across a firmware update.
    pub fn backup_mcu(&mut self) -> Result<McuBackup> {
        Ok(McuBackup {
            ctl_rom: self.read_control(ControlBank::Rom)?,
            serial: self.read_serial()?,
        })
    }

    pub fn restore_mcu(&mut self, backup: &McuBackup) -> Result<()> {
        self.write_control(ControlBank::Rom, backup.ctl_rom)?;
        if !backup.serial.is_empty() {
            self.write_serial(&backup.serial)?;
        }
        Ok(())
    }
}
