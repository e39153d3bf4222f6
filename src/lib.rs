//! Glove Bridge
//!
//! Reads the left and right finger-tracking gloves over USB HID, decodes their
//! packed curl/splay reports and streams normalized frames to the VR driver
//! through one named pipe per hand.

pub mod bridge;
pub mod domain;
pub mod infrastructure;
