use crate::cmd::{Result, UsbJtagError};
use crate::{
    FRAME_SIZE, USBJTAG_EP_IN, USBJTAG_EP_OUT, USBJTAG_IFACE, USBJTAG_PID, USBJTAG_TIMEOUT,
    USBJTAG_VID,
};

use log::{debug, trace, warn};
use rusb::{Device, DeviceHandle, UsbContext};
use std::time::Duration;

/// A bidirectional frame pipe to the adapter.
///
/// Every call performs exactly one transfer. Implemented by [`UsbTransport`]
/// for real hardware; anything else (a recording mock, a replay log) can sit
/// underneath [`crate::UsbJtag`] as well.
pub trait Transport {
    /// Send one frame to the device.
    fn write(&mut self, buf: &[u8]) -> Result<()>;
    /// Receive one frame (up to [`FRAME_SIZE`] bytes) from the device.
    fn read(&mut self) -> Result<Vec<u8>>;
}

/// Discards one pending frame, if any, left over from an earlier session.
///
/// Never fails: a timeout means nothing was queued, any other error is
/// logged and ignored so the caller's next transfer starts clean.
pub fn flush_input<B: Transport + ?Sized>(transport: &mut B) {
    match transport.read() {
        Ok(stale) => debug!("flushed {} stale bytes", stale.len()),
        Err(UsbJtagError::TransportTimeout) => {}
        Err(e) => warn!("input flush failed: {}", e),
    }
}

/// Bulk endpoint pair on the adapter, claimed through libusb.
///
/// Not `Clone`: a handle is the single owner of the interface claim until it
/// is closed or dropped.
#[derive(Debug)]
pub struct UsbTransport<T: UsbContext> {
    _context: T,
    handle: Option<DeviceHandle<T>>,

    iface: u8,
    in_addr: u8,
    out_addr: u8,
    timeout: Duration,

    has_kernel_driver: bool,
}

impl<T: UsbContext> Drop for UsbTransport<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: UsbContext> UsbTransport<T> {
    /// Opens the adapter, by default at [`USBJTAG_VID`]:[`USBJTAG_PID`].
    ///
    /// Claims interface 0 and discards any byte left in the IN endpoint by a
    /// previous session.
    pub fn open(mut ctx: T, vidpid: impl Into<Option<(u16, u16)>>) -> Result<Self> {
        let (vid, pid) = vidpid.into().unwrap_or((USBJTAG_VID, USBJTAG_PID));

        let (device, handle) =
            Self::open_device(&mut ctx, vid, pid)?.ok_or(UsbJtagError::DeviceNotFound)?;
        debug!(
            "opened {:04x}:{:04x} at bus {} address {}",
            vid,
            pid,
            device.bus_number(),
            device.address()
        );

        let iface = USBJTAG_IFACE;
        let has_kernel_driver = match handle.kernel_driver_active(iface) {
            Ok(true) => {
                handle
                    .detach_kernel_driver(iface)
                    .map_err(UsbJtagError::DeviceOpenFailed)?;
                true
            }
            _ => false,
        };

        if let Err(e) = handle.set_active_configuration(1) {
            debug!("could not set active configuration: {}", e);
        }

        if let Err(e) = handle.claim_interface(iface) {
            if has_kernel_driver {
                if let Err(e) = handle.attach_kernel_driver(iface) {
                    warn!("could not reattach kernel driver: {}", e);
                }
            }
            return Err(UsbJtagError::DeviceOpenFailed(e));
        }

        let mut transport = UsbTransport {
            _context: ctx,
            handle: Some(handle),

            iface,
            in_addr: USBJTAG_EP_IN,
            out_addr: USBJTAG_EP_OUT,
            timeout: USBJTAG_TIMEOUT,

            has_kernel_driver,
        };

        flush_input(&mut transport);

        Ok(transport)
    }

    /// Overrides the per-transfer timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Releases the interface claim. Calling it again is a no-op.
    pub fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        if let Err(e) = handle.release_interface(self.iface) {
            warn!("could not release interface: {}", e);
        }
        if self.has_kernel_driver {
            if let Err(e) = handle.attach_kernel_driver(self.iface) {
                warn!("could not reattach kernel driver: {}", e);
            }
        }
        debug!("device closed");
    }

    fn open_device(
        ctx: &mut T,
        vid: u16,
        pid: u16,
    ) -> Result<Option<(Device<T>, DeviceHandle<T>)>> {
        let devices = match ctx.devices() {
            Ok(d) => d,
            Err(_) => return Ok(None),
        };

        for device in devices.iter() {
            let device_desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(_) => continue,
            };

            if device_desc.vendor_id() == vid && device_desc.product_id() == pid {
                let handle = device.open().map_err(UsbJtagError::DeviceOpenFailed)?;
                return Ok(Some((device, handle)));
            }
        }

        Ok(None)
    }

    fn handle(&self) -> Result<&DeviceHandle<T>> {
        self.handle.as_ref().ok_or(UsbJtagError::DeviceClosed)
    }
}

impl<T: UsbContext> Transport for UsbTransport<T> {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        trace!("tx {:02x?}", buf);
        let len = self.handle()?.write_bulk(self.out_addr, buf, self.timeout)?;

        if len != buf.len() {
            return Err(UsbJtagError::TransportIo(rusb::Error::Io));
        }

        Ok(())
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        let mut buf: Vec<u8> = vec![0; FRAME_SIZE];
        let len = self
            .handle()?
            .read_bulk(self.in_addr, &mut buf, self.timeout)?;

        buf.truncate(len);
        trace!("rx {:02x?}", buf);
        Ok(buf)
    }
}
