//! Glove Report Codec
//!
//! Converts the fixed 25-byte HID input report into a [`CanonicalFrame`].
//!
//! # Report Structure (25 bytes)
//!
//! ```text
//! [0]      : Header byte (button bits, see below)
//! [1-3]    : Thumb  finger record
//! [4-6]    : Index  finger record
//! [7-9]    : Middle finger record
//! [10-12]  : Ring   finger record
//! [13-15]  : Pinky  finger record
//! [16-24]  : Reserved (ignored)
//!
//! Finger record (24 bits, little-endian, packed):
//!   bits [0..13]  : curl   (u14, 0 = straight, 16383 = fully curled)
//!   bits [14..23] : splay  (i10, two's complement, 0 = neutral)
//!
//! Header byte:
//!   bit 0: Joystick button
//!   bit 1: Trigger button
//!   bit 2: A button
//!   bit 3: B button
//!   bit 4: Grab
//!   bit 5: Pinch
//!   bit 6: Menu
//!   bit 7: Calibrate
//! ```
//!
//! This report revision has no joystick or analog trigger fields; those axes
//! decode to neutral and the frame is flagged with
//! `analog_inputs_reported = false`.

use crate::domain::models::{CanonicalFrame, Side, FINGER_COUNT, JOINTS_PER_FINGER};
use thiserror::Error;

/// Total size of one input report, including the reserved tail.
pub const REPORT_LEN: usize = 25;

/// Offset of the first finger record.
const FINGERS_START: usize = 1;

/// End of the finger records; bytes from here to `REPORT_LEN` are reserved.
pub const FINGERS_END: usize = FINGERS_START + FINGER_COUNT * FINGER_RECORD_LEN;

/// Size of one packed finger record.
pub const FINGER_RECORD_LEN: usize = 3;

const CURL_BITS: u32 = 14;
const SPLAY_BITS: u32 = 10;
const CURL_MASK: u32 = (1 << CURL_BITS) - 1;
const SPLAY_MASK: u32 = (1 << SPLAY_BITS) - 1;

/// Full-scale curl reading.
pub const CURL_MAX: u16 = CURL_MASK as u16;

/// Splay magnitude that maps to +/-1.0.
pub const SPLAY_SCALE: f32 = (1 << (SPLAY_BITS - 1)) as f32;

pub mod header_bits {
    pub const JOY_BUTTON: u8 = 0x01;
    pub const TRG_BUTTON: u8 = 0x02;
    pub const A_BUTTON: u8 = 0x04;
    pub const B_BUTTON: u8 = 0x08;
    pub const GRAB: u8 = 0x10;
    pub const PINCH: u8 = 0x20;
    pub const MENU: u8 = 0x40;
    pub const CALIBRATE: u8 = 0x80;
}

/// One raw input report, exactly as read from the glove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReport([u8; REPORT_LEN]);

impl RawReport {
    pub const fn new(bytes: [u8; REPORT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn header(&self) -> u8 {
        self.0[0]
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }

    /// Packed record of finger `index` (0 = thumb .. 4 = pinky).
    pub fn finger(&self, index: usize) -> [u8; FINGER_RECORD_LEN] {
        let start = FINGERS_START + index * FINGER_RECORD_LEN;
        [self.0[start], self.0[start + 1], self.0[start + 2]]
    }
}

impl From<[u8; REPORT_LEN]> for RawReport {
    fn from(bytes: [u8; REPORT_LEN]) -> Self {
        Self(bytes)
    }
}

/// Raw fields of one finger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerSample {
    /// Unsigned 14-bit curl.
    pub curl: u16,
    /// Sign-extended 10-bit splay in `-512..=511`.
    pub splay: i16,
}

/// Unpack a 3-byte finger record.
pub fn unpack_finger(record: [u8; FINGER_RECORD_LEN]) -> FingerSample {
    let packed = u32::from(record[0]) | u32::from(record[1]) << 8 | u32::from(record[2]) << 16;

    let curl = (packed & CURL_MASK) as u16;
    let splay_raw = ((packed >> CURL_BITS) & SPLAY_MASK) as u16;

    // sign-extend from bit 9
    let shift = 16 - SPLAY_BITS;
    let splay = ((splay_raw << shift) as i16) >> shift;

    FingerSample { curl, splay }
}

pub fn normalize_curl(curl: u16) -> f32 {
    (f32::from(curl) / f32::from(CURL_MAX)).clamp(0.0, 1.0)
}

pub fn normalize_splay(splay: i16) -> f32 {
    (f32::from(splay) / SPLAY_SCALE).clamp(-1.0, 1.0)
}

/// Decode a report into a canonical frame. Never fails; every output is clamped.
pub fn decode(report: &RawReport, side: Side) -> CanonicalFrame {
    let mut frame = CanonicalFrame::idle(side);

    for finger in 0..FINGER_COUNT {
        let sample = unpack_finger(report.finger(finger));
        frame.flexion[finger] = [normalize_curl(sample.curl); JOINTS_PER_FINGER];
        frame.splay[finger] = normalize_splay(sample.splay);
    }

    let header = report.header();
    frame.joy_button = header & header_bits::JOY_BUTTON != 0;
    frame.trg_button = header & header_bits::TRG_BUTTON != 0;
    frame.a_button = header & header_bits::A_BUTTON != 0;
    frame.b_button = header & header_bits::B_BUTTON != 0;
    frame.grab = header & header_bits::GRAB != 0;
    frame.pinch = header & header_bits::PINCH != 0;
    frame.menu = header & header_bits::MENU != 0;
    frame.calibrate = header & header_bits::CALIBRATE != 0;

    frame.joy_x = 0.0;
    frame.joy_y = 0.0;
    frame.trg_value = 0.0;
    frame.analog_inputs_reported = false;

    frame
}

/// A decoded value outside its declared range. Indicates a wire-format
/// mismatch between this build and the glove firmware.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} = {value} is outside [{min}, {max}]")]
pub struct FrameInvariantError {
    pub field: &'static str,
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

fn check(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), FrameInvariantError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(FrameInvariantError {
            field,
            value,
            min,
            max,
        })
    }
}

/// Check every numeric field of `frame` against its declared range.
pub fn validate(frame: &CanonicalFrame) -> Result<(), FrameInvariantError> {
    for value in frame.flexion.iter().flatten() {
        check("flexion", *value, 0.0, 1.0)?;
    }
    for value in &frame.splay {
        check("splay", *value, -1.0, 1.0)?;
    }
    check("joy_x", frame.joy_x, -1.0, 1.0)?;
    check("joy_y", frame.joy_y, -1.0, 1.0)?;
    check("trg_value", frame.trg_value, 0.0, 1.0)
}
