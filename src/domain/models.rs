use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of tracked fingers per glove (thumb, index, middle, ring, pinky).
pub const FINGER_COUNT: usize = 5;

/// Joint slots per finger in the flexion grid expected by the VR driver.
pub const JOINTS_PER_FINGER: usize = 4;

/// Vendor id shared by both gloves.
pub const GLOVE_VENDOR_ID: u16 = 0x1915;
pub const LEFT_GLOVE_PRODUCT_ID: u16 = 0xEEE1;
pub const RIGHT_GLOVE_PRODUCT_ID: u16 = 0xEEE0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// USB vendor/product pair identifying one glove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceId {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// Well-known id of the glove worn on `side`.
    pub const fn glove(side: Side) -> Self {
        match side {
            Side::Left => Self::new(GLOVE_VENDOR_ID, LEFT_GLOVE_PRODUCT_ID),
            Side::Right => Self::new(GLOVE_VENDOR_ID, RIGHT_GLOVE_PRODUCT_ID),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vendor_id, self.product_id)
    }
}

/// Descriptor strings reported by a connected glove. Empty when a query failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub manufacturer: String,
    pub product: String,
    pub serial_number: String,
}

/// One decoded, normalized sensor sample for a single glove.
///
/// Every numeric field lies inside its declared range:
/// - `flexion`, `trg_value`: `[0.0, 1.0]`
/// - `splay`, `joy_x`, `joy_y`: `[-1.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalFrame {
    pub side: Side,

    /// One row per finger, four joint samples per row.
    pub flexion: [[f32; JOINTS_PER_FINGER]; FINGER_COUNT],
    pub splay: [f32; FINGER_COUNT],

    pub joy_x: f32,
    pub joy_y: f32,

    pub joy_button: bool,
    pub trg_button: bool,
    pub a_button: bool,
    pub b_button: bool,
    pub grab: bool,
    pub pinch: bool,
    pub menu: bool,
    pub calibrate: bool,

    pub trg_value: f32,

    /// False when the report revision carries no joystick/trigger data and
    /// those axes were filled with neutral values.
    pub analog_inputs_reported: bool,
}

impl CanonicalFrame {
    /// Neutral frame: straight fingers, centered splay and stick, nothing pressed.
    pub fn idle(side: Side) -> Self {
        Self {
            side,
            flexion: [[0.0; JOINTS_PER_FINGER]; FINGER_COUNT],
            splay: [0.0; FINGER_COUNT],
            joy_x: 0.0,
            joy_y: 0.0,
            joy_button: false,
            trg_button: false,
            a_button: false,
            b_button: false,
            grab: false,
            pinch: false,
            menu: false,
            calibrate: false,
            trg_value: 0.0,
            analog_inputs_reported: false,
        }
    }

    /// Buttons in wire order.
    pub fn buttons(&self) -> [bool; 8] {
        [
            self.joy_button,
            self.trg_button,
            self.a_button,
            self.b_button,
            self.grab,
            self.pinch,
            self.menu,
            self.calibrate,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glove_ids() {
        assert_eq!(DeviceId::glove(Side::Left).to_string(), "1915:EEE1");
        assert_eq!(DeviceId::glove(Side::Right).to_string(), "1915:EEE0");
    }

    #[test]
    fn test_idle_frame_is_neutral() {
        let frame = CanonicalFrame::idle(Side::Right);
        assert_eq!(frame.side, Side::Right);
        assert!(frame.flexion.iter().flatten().all(|&v| v == 0.0));
        assert!(frame.buttons().iter().all(|&b| !b));
    }
}
