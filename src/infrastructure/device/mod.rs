//! Glove Device Module
//!
//! Provides HID report access to the gloves.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                DeviceSession                 │
//! │  (one per side: connection state, reconnect) │
//! └──────────────────────┬───────────────────────┘
//!                        │ DeviceTransport / DeviceHandle
//!                        ▼
//!               ┌──────────────────┐
//!               │ UsbHidTransport  │
//!               │ - open by id     │
//!               │ - interrupt IN   │
//!               │ - descriptors    │
//!               └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`session`] - Per-side session with reconnect policy
//! - [`usb`] - libusb backend

pub mod session;
pub mod usb;

pub use session::{DeviceSession, ReadFailure};
pub use usb::UsbHidTransport;

use crate::domain::models::DeviceId;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The device went away; the handle is no longer usable.
    #[error("device disconnected: {0}")]
    Disconnected(String),
    /// A single transfer failed (overflow, busy, ...); the handle stays valid.
    #[error("transfer failed: {0}")]
    Transfer(String),
}

/// Opens glove handles by vendor/product id.
pub trait DeviceTransport {
    type Handle: DeviceHandle;

    /// Open the first device matching `id`. `None` when no such device is present
    /// or it cannot be claimed.
    fn open(&self, id: DeviceId) -> Option<Self::Handle>;
}

/// An open glove. Dropping the handle releases the device.
pub trait DeviceHandle {
    /// Read one input report into `buf`, waiting at most `timeout`.
    /// Returns `Ok(0)` when the timeout elapsed without data.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    fn manufacturer(&self) -> Option<String>;
    fn product(&self) -> Option<String>;
    fn serial_number(&self) -> Option<String>;

    /// Arbitrary string descriptor by index.
    fn indexed_string(&self, index: u8) -> Option<String>;
}
