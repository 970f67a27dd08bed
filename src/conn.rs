use crate::cmd::{Result, UsbJtagCmd, UsbJtagError};
use crate::usb::Transport;

use log::trace;

/// Connection to a USB JTAG adapter.
///
/// Owns the transport exclusively; every operation issues its frames in
/// order and, for paired calls, waits for the response before returning.
/// There is no locking: sharing one adapter between threads is done by
/// moving the connection, not by cloning it.
#[derive(Debug)]
pub struct UsbJtag<B: Transport> {
    transport: B,
}

impl<B: Transport> UsbJtag<B> {
    pub fn new(transport: B) -> Self {
        UsbJtag { transport }
    }

    pub fn transport(&self) -> &B {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut B {
        &mut self.transport
    }

    /// Gives the underlying transport back, e.g. to close it before the
    /// microcontroller drops off the bus.
    pub fn into_transport(self) -> B {
        self.transport
    }

    /// Writes `[opcode, arg, payload...]` without waiting for a response.
    pub fn send(&mut self, opcode: u8, arg: u8, payload: &[u8]) -> Result<()> {
        let cmd = UsbJtagCmd::new(opcode, arg, payload)?;
        trace!(
            "send {:02x}:{:02x} ({} byte payload)",
            cmd.opcode(),
            cmd.arg(),
            cmd.payload().len()
        );
        self.transport.write(&cmd.to_bytes())
    }

    /// Writes a frame then reads one response frame.
    ///
    /// With `expected` set, a response of any other length is an error.
    pub fn call(
        &mut self,
        opcode: u8,
        arg: u8,
        payload: &[u8],
        expected: Option<usize>,
    ) -> Result<Vec<u8>> {
        self.send(opcode, arg, payload)?;
        let resp = self.transport.read()?;

        match expected {
            Some(expected) if resp.len() != expected => {
                Err(UsbJtagError::UnexpectedResponseLength {
                    expected,
                    actual: resp.len(),
                })
            }
            _ => Ok(resp),
        }
    }
}
