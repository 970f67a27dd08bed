use crate::cmd::{Opcode, Result, SpiCmd, UsbJtagError};
use crate::conn::UsbJtag;
use crate::usb::Transport;
use crate::SPI_MAX;

fn check_spi(data: &[u8]) -> Result<()> {
    if data.is_empty() || data.len() > SPI_MAX {
        return Err(UsbJtagError::InvalidLength);
    }
    Ok(())
}

impl<B: Transport> UsbJtag<B> {
    /// Clocks 1 to 62 bytes out on the SPI bus, discarding what comes back.
    pub fn spi_write(&mut self, data: &[u8]) -> Result<()> {
        check_spi(data)?;
        self.send(Opcode::Spi as u8, SpiCmd::Write as u8, data)
    }

    /// Full duplex transaction: one received byte per byte sent.
    pub fn spi_write_read(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        check_spi(data)?;
        self.call(
            Opcode::Spi as u8,
            SpiCmd::WriteRead as u8,
            data,
            Some(data.len()),
        )
    }
}
