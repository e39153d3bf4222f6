//! Driver Channel Module
//!
//! Delivers canonical frames to the VR driver over one named pipe per side.
//!
//! - [`wire`] - Fixed-size record encoding
//! - [`writer`] - Best-effort, non-blocking pipe writer

pub mod wire;
pub mod writer;

pub use wire::{encode_frame, FRAME_RECORD_LEN};
pub use writer::{ChannelError, DropReason, SendResult, TransportWriter};
