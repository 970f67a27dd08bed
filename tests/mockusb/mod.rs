#![allow(dead_code)]

use std::collections::VecDeque;

use usbjtag_rs::cmd::{JtagCmd, McuCmd, Result, SpiCmd};
use usbjtag_rs::{Opcode, Transport, UsbJtagError, SERIAL_LEN};

/// Transport standing in for the adapter.
///
/// Records every frame written. Reads return scripted responses first; once
/// those run out the mock answers like the firmware would for the last
/// frame written, or times out if that frame expects no answer.
pub struct MockTransport {
    pub writes: Vec<Vec<u8>>,
    pub reads: usize,
    pub responses: VecDeque<Result<Vec<u8>>>,

    pub ctl: [u8; 2],
    pub serial: [u8; SERIAL_LEN],
    pub vbus: u8,
    pub err: u8,
    /// Register value clocked out on a 6-byte JTAG read, before the adapter
    /// reverses it.
    pub jtag_read: Option<[u8; 6]>,
    /// Fail writes of the reset-to-bootloader frame, like a device that
    /// detaches mid-transfer.
    pub detach_on_isp: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            writes: vec![],
            reads: 0,
            responses: VecDeque::new(),

            ctl: [0x00; 2],
            serial: [0x00; SERIAL_LEN],
            vbus: 0,
            err: 0,
            jtag_read: None,
            detach_on_isp: false,
        }
    }

    pub fn respond(&mut self, resp: &[u8]) {
        self.responses.push_back(Ok(resp.to_vec()));
    }

    pub fn respond_err(&mut self, err: UsbJtagError) {
        self.responses.push_back(Err(err));
    }

    /// Frames written with the given opcode and sub-opcode.
    pub fn frames(&self, opcode: Opcode, arg: u8) -> Vec<&Vec<u8>> {
        self.writes
            .iter()
            .filter(|f| f[0] == opcode as u8 && f[1] == arg)
            .collect()
    }

    fn emulate(&self) -> Result<Vec<u8>> {
        let frame = match self.writes.last() {
            Some(f) => f,
            None => return Err(UsbJtagError::TransportTimeout),
        };
        let payload = &frame[2..];

        match Opcode::try_from(frame[0]) {
            Ok(Opcode::Mcu) => match frame[1] {
                x if x == McuCmd::ReadControl as u8 => Ok(vec![self.ctl[payload[0] as usize]]),
                x if x == McuCmd::ReadVbus as u8 => Ok(vec![self.vbus]),
                x if x == McuCmd::ReadError as u8 => Ok(vec![self.err]),
                x if x == McuCmd::ReadSerial as u8 => Ok(self.serial.to_vec()),
                _ => Err(UsbJtagError::TransportTimeout),
            },
            Ok(Opcode::Jtag) => match frame[1] {
                x if x == JtagCmd::WriteRead as u8 => {
                    let n = payload.len() / 2;
                    match self.jtag_read {
                        Some(reg) if n == 6 => Ok(reg.to_vec()),
                        _ => Ok(vec![0x00; n]),
                    }
                }
                x if x == JtagCmd::FastWriteRead as u8 => Ok(payload.to_vec()),
                _ => Err(UsbJtagError::TransportTimeout),
            },
            Ok(Opcode::Spi) if frame[1] == SpiCmd::WriteRead as u8 => {
                Ok(payload.iter().map(|b| !b).collect())
            }
            _ => Err(UsbJtagError::TransportTimeout),
        }
    }
}

impl Transport for MockTransport {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        assert!(buf.len() >= 2 && buf.len() <= 64, "bad frame {:02x?}", buf);
        self.writes.push(buf.to_vec());

        if buf[0] == Opcode::Mcu as u8 {
            let payload = &buf[2..];
            match buf[1] {
                x if x == McuCmd::WriteControl as u8 => self.ctl[payload[0] as usize] = payload[1],
                x if x == McuCmd::WriteSerial as u8 => {
                    self.serial = [0x00; SERIAL_LEN];
                    self.serial[..payload.len()].copy_from_slice(payload);
                }
                x if x == McuCmd::ResetIsp as u8 && self.detach_on_isp => {
                    return Err(UsbJtagError::TransportIo(rusb::Error::NoDevice));
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        self.reads += 1;
        match self.responses.pop_front() {
            Some(resp) => resp,
            None => self.emulate(),
        }
    }
}
