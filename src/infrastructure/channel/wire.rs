//! Driver Wire Format
//!
//! Each frame is written to the driver pipe as one fixed-size record, no
//! header, no delimiter. Field order matches the driver's input struct.
//!
//! # Record Structure (120 bytes)
//!
//! ```text
//! [0-79]    : flexion, 5 fingers x 4 joints (f32 each, finger-major)
//! [80-99]   : splay, 5 fingers (f32 each)
//! [100-103] : joyX (f32)
//! [104-107] : joyY (f32)
//! [108]     : joyButton  (0 / 1)
//! [109]     : trgButton
//! [110]     : aButton
//! [111]     : bButton
//! [112]     : grab
//! [113]     : pinch
//! [114]     : menu
//! [115]     : calibrate
//! [116-119] : trgValue (f32)
//! ```
//!
//! All floats are IEEE-754 little-endian.

use crate::domain::models::{CanonicalFrame, FINGER_COUNT, JOINTS_PER_FINGER};

pub const FRAME_RECORD_LEN: usize = (FINGER_COUNT * JOINTS_PER_FINGER + FINGER_COUNT + 2) * 4 + 8 + 4;

struct RecordWriter {
    buf: [u8; FRAME_RECORD_LEN],
    pos: usize,
}

impl RecordWriter {
    fn new() -> Self {
        Self {
            buf: [0u8; FRAME_RECORD_LEN],
            pos: 0,
        }
    }

    fn put_f32(&mut self, value: f32) {
        self.buf[self.pos..self.pos + 4].copy_from_slice(&value.to_le_bytes());
        self.pos += 4;
    }

    fn put_bool(&mut self, value: bool) {
        self.buf[self.pos] = u8::from(value);
        self.pos += 1;
    }

    fn finish(self) -> [u8; FRAME_RECORD_LEN] {
        debug_assert_eq!(self.pos, FRAME_RECORD_LEN);
        self.buf
    }
}

/// Serialize `frame` into the driver record.
pub fn encode_frame(frame: &CanonicalFrame) -> [u8; FRAME_RECORD_LEN] {
    let mut writer = RecordWriter::new();

    for value in frame.flexion.iter().flatten() {
        writer.put_f32(*value);
    }
    for value in &frame.splay {
        writer.put_f32(*value);
    }
    writer.put_f32(frame.joy_x);
    writer.put_f32(frame.joy_y);
    for pressed in frame.buttons() {
        writer.put_bool(pressed);
    }
    writer.put_f32(frame.trg_value);

    writer.finish()
}
