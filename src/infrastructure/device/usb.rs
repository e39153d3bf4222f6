//! libusb-backed HID access
//!
//! The gloves are plain HID devices streaming fixed-size input reports on an
//! interrupt IN endpoint. We claim the HID interface directly instead of going
//! through the OS HID stack.

use crate::domain::models::DeviceId;
use crate::infrastructure::device::{DeviceHandle, DeviceTransport, TransportError};
use rusb::{DeviceDescriptor, Direction, GlobalContext, TransferType};
use std::time::Duration;
use tracing::{debug, trace};

const HID_CLASS: u8 = 0x03;

/// libusb treats a zero timeout as "wait forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Opens gloves through libusb's global context.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsbHidTransport;

impl DeviceTransport for UsbHidTransport {
    type Handle = UsbHidDevice;

    fn open(&self, id: DeviceId) -> Option<UsbHidDevice> {
        match UsbHidDevice::open(id) {
            Ok(device) => device,
            Err(e) => {
                debug!("Failed to open {}: {}", id, e);
                None
            }
        }
    }
}

/// A claimed glove HID interface. The interface is released on drop.
pub struct UsbHidDevice {
    handle: rusb::DeviceHandle<GlobalContext>,
    descriptor: DeviceDescriptor,
    interface_number: u8,
    endpoint_in: u8,
    interface_claimed: bool,
}

impl UsbHidDevice {
    /// `Ok(None)` when no device matches `id`.
    fn open(id: DeviceId) -> Result<Option<Self>, rusb::Error> {
        let Some(handle) = rusb::open_device_with_vid_pid(id.vendor_id, id.product_id) else {
            return Ok(None);
        };

        let device = handle.device();
        let descriptor = device.device_descriptor()?;
        let config = device.active_config_descriptor()?;

        let Some((interface_number, endpoint_in)) = Self::find_hid_endpoint(&config) else {
            debug!("{} has no HID interrupt IN endpoint", id);
            return Ok(None);
        };

        let mut device = Self {
            handle,
            descriptor,
            interface_number,
            endpoint_in,
            interface_claimed: false,
        };
        device.claim()?;

        trace!(
            "Claimed {} interface {} endpoint {:#04x}",
            id,
            interface_number,
            endpoint_in
        );
        Ok(Some(device))
    }

    /// First HID interface with an interrupt IN endpoint.
    fn find_hid_endpoint(config: &rusb::ConfigDescriptor) -> Option<(u8, u8)> {
        config
            .interfaces()
            .flat_map(|interface| interface.descriptors())
            .filter(|desc| desc.class_code() == HID_CLASS)
            .find_map(|desc| {
                desc.endpoint_descriptors()
                    .find(|ep| {
                        ep.transfer_type() == TransferType::Interrupt
                            && ep.direction() == Direction::In
                    })
                    .map(|ep| (desc.interface_number(), ep.address()))
            })
    }

    fn claim(&mut self) -> Result<(), rusb::Error> {
        // Not supported on every platform; claiming still works where the OS
        // has no driver bound.
        if let Err(e) = self.handle.set_auto_detach_kernel_driver(true) {
            trace!("Auto-detach of kernel driver unavailable: {}", e);
        }
        self.handle.claim_interface(self.interface_number)?;
        self.interface_claimed = true;
        Ok(())
    }

    fn release_interface(&mut self) {
        if self.interface_claimed {
            // device may already be gone
            let _ = self.handle.release_interface(self.interface_number);
            self.interface_claimed = false;
            trace!("[Release] HID interface released");
        }
    }
}

impl DeviceHandle for UsbHidDevice {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let timeout = timeout.max(MIN_READ_TIMEOUT);
        match self.handle.read_interrupt(self.endpoint_in, buf, timeout) {
            Ok(n) => Ok(n),
            Err(rusb::Error::Timeout) | Err(rusb::Error::Interrupted) => Ok(0),
            Err(e @ (rusb::Error::NoDevice | rusb::Error::Io | rusb::Error::Pipe)) => {
                Err(TransportError::Disconnected(e.to_string()))
            }
            // overflow, busy, ...: only this transfer failed
            Err(e) => Err(TransportError::Transfer(e.to_string())),
        }
    }

    fn manufacturer(&self) -> Option<String> {
        self.handle
            .read_manufacturer_string_ascii(&self.descriptor)
            .ok()
    }

    fn product(&self) -> Option<String> {
        self.handle.read_product_string_ascii(&self.descriptor).ok()
    }

    fn serial_number(&self) -> Option<String> {
        self.handle
            .read_serial_number_string_ascii(&self.descriptor)
            .ok()
    }

    fn indexed_string(&self, index: u8) -> Option<String> {
        self.handle.read_string_descriptor_ascii(index).ok()
    }
}

impl Drop for UsbHidDevice {
    fn drop(&mut self) {
        self.release_interface();
    }
}
