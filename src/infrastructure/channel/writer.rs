//! Driver pipe writer
//!
//! Pushes encoded frames into the named pipe of one side. Writes never block:
//! a full pipe drops the frame, a broken pipe drops every later frame. The pipe
//! is connected once at startup and never reopened.

use crate::domain::models::{CanonicalFrame, Side};
use crate::infrastructure::channel::wire::{encode_frame, FRAME_RECORD_LEN};
use interprocess::local_socket::{
    traits::Stream, GenericFilePath, Stream as LocalStream, ToFsName,
};
use std::fmt;
use std::io::{self, Write};
use thiserror::Error;
use tracing::{info, trace, warn};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("invalid pipe name {name}: {source}")]
    InvalidName { name: String, source: io::Error },
    #[error("failed to connect to {name}: {source}")]
    Connect { name: String, source: io::Error },
    #[error("failed to make {name} non-blocking: {source}")]
    NonBlocking { name: String, source: io::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The driver is not draining the pipe fast enough.
    ChannelFull,
    /// No pipe was connected, or it broke.
    ChannelUnavailable,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::ChannelFull => f.write_str("channel full"),
            DropReason::ChannelUnavailable => f.write_str("channel unavailable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    Sent,
    Dropped(DropReason),
}

/// Connect to the driver pipe `name` in non-blocking mode.
pub fn open_pipe(name: &str) -> Result<LocalStream, ChannelError> {
    let pipe_name = name
        .to_fs_name::<GenericFilePath>()
        .map_err(|source| ChannelError::InvalidName {
            name: name.to_string(),
            source,
        })?;
    let stream = LocalStream::connect(pipe_name).map_err(|source| ChannelError::Connect {
        name: name.to_string(),
        source,
    })?;
    stream
        .set_nonblocking(true)
        .map_err(|source| ChannelError::NonBlocking {
            name: name.to_string(),
            source,
        })?;
    Ok(stream)
}

pub struct TransportWriter {
    side: Side,
    sink: Option<Box<dyn Write + Send>>,
    /// Unwritten tail of a partially written record.
    pending: Vec<u8>,
}

impl TransportWriter {
    /// Connect to the driver pipe. A pipe that cannot be opened leaves the
    /// writer unavailable; every frame is then dropped.
    pub fn connect(side: Side, pipe_name: &str) -> Self {
        match open_pipe(pipe_name) {
            Ok(stream) => {
                info!("{} pipe connected: {}", side, pipe_name);
                Self::with_sink(side, Box::new(stream))
            }
            Err(e) => {
                warn!("{} pipe unavailable, frames will be dropped: {}", side, e);
                Self::unavailable(side)
            }
        }
    }

    pub fn with_sink(side: Side, sink: Box<dyn Write + Send>) -> Self {
        Self {
            side,
            sink: Some(sink),
            pending: Vec::with_capacity(FRAME_RECORD_LEN),
        }
    }

    pub fn unavailable(side: Side) -> Self {
        Self {
            side,
            sink: None,
            pending: Vec::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.sink.is_some()
    }

    /// Encode and write one frame without blocking.
    pub fn send(&mut self, frame: &CanonicalFrame) -> SendResult {
        let Some(sink) = self.sink.as_mut() else {
            return SendResult::Dropped(DropReason::ChannelUnavailable);
        };

        // finish the previous record first so the driver never sees a torn frame
        if !self.pending.is_empty() {
            match sink.write(&self.pending) {
                Ok(0) => return self.broken(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.pending.drain(..n);
                    if !self.pending.is_empty() {
                        return SendResult::Dropped(DropReason::ChannelFull);
                    }
                }
                Err(e) if is_transient(&e) => {
                    return SendResult::Dropped(DropReason::ChannelFull);
                }
                Err(e) => return self.broken(e),
            }
        }

        let record = encode_frame(frame);
        match sink.write(&record) {
            Ok(0) => self.broken(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                if n < record.len() {
                    trace!("{} pipe accepted {} of {} bytes", self.side, n, record.len());
                    self.pending.extend_from_slice(&record[n..]);
                }
                SendResult::Sent
            }
            Err(e) if is_transient(&e) => SendResult::Dropped(DropReason::ChannelFull),
            Err(e) => self.broken(e),
        }
    }

    fn broken(&mut self, error: io::Error) -> SendResult {
        warn!("{} pipe broken, dropping frames from now on: {}", self.side, error);
        self.sink = None;
        self.pending.clear();
        SendResult::Dropped(DropReason::ChannelUnavailable)
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy)]
    pub enum WriteStep {
        /// Accept up to this many bytes.
        Accept(usize),
        WouldBlock,
        Broken,
    }

    #[derive(Default)]
    pub struct SinkState {
        pub written: Vec<u8>,
        pub steps: VecDeque<WriteStep>,
    }

    /// Write sink with scripted behaviour; accepts everything once the script runs out.
    #[derive(Clone, Default)]
    pub struct MockSink {
        pub state: Arc<Mutex<SinkState>>,
    }

    impl MockSink {
        pub fn push(&self, step: WriteStep) {
            self.state.lock().unwrap().steps.push_back(step);
        }

        pub fn written(&self) -> Vec<u8> {
            self.state.lock().unwrap().written.clone()
        }
    }

    impl Write for MockSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut state = self.state.lock().unwrap();
            match state.steps.pop_front().unwrap_or(WriteStep::Accept(usize::MAX)) {
                WriteStep::Accept(limit) => {
                    let n = buf.len().min(limit);
                    state.written.extend_from_slice(&buf[..n]);
                    Ok(n)
                }
                WriteStep::WouldBlock => Err(io::ErrorKind::WouldBlock.into()),
                WriteStep::Broken => Err(io::ErrorKind::BrokenPipe.into()),
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockSink, WriteStep};
    use super::*;

    fn frame(value: f32) -> CanonicalFrame {
        let mut frame = CanonicalFrame::idle(Side::Left);
        frame.flexion[0][0] = value;
        frame
    }

    fn writer(sink: &MockSink) -> TransportWriter {
        TransportWriter::with_sink(Side::Left, Box::new(sink.clone()))
    }

    #[test]
    fn test_send_writes_whole_record() {
        let sink = MockSink::default();
        let mut writer = writer(&sink);
        assert_eq!(writer.send(&frame(0.5)), SendResult::Sent);
        assert_eq!(sink.written(), encode_frame(&frame(0.5)).to_vec());
    }

    #[test]
    fn test_unavailable_drops() {
        let mut writer = TransportWriter::unavailable(Side::Right);
        assert!(!writer.is_available());
        assert_eq!(
            writer.send(&frame(0.1)),
            SendResult::Dropped(DropReason::ChannelUnavailable)
        );
    }

    #[test]
    fn test_full_pipe_drops_without_blocking() {
        let sink = MockSink::default();
        let mut writer = writer(&sink);
        sink.push(WriteStep::WouldBlock);

        assert_eq!(
            writer.send(&frame(0.1)),
            SendResult::Dropped(DropReason::ChannelFull)
        );
        assert!(sink.written().is_empty());

        // pipe drained again
        assert_eq!(writer.send(&frame(0.2)), SendResult::Sent);
        assert_eq!(sink.written(), encode_frame(&frame(0.2)).to_vec());
    }

    #[test]
    fn test_partial_write_keeps_framing() {
        let sink = MockSink::default();
        let mut writer = writer(&sink);

        sink.push(WriteStep::Accept(50));
        assert_eq!(writer.send(&frame(0.1)), SendResult::Sent);

        // tail can't be flushed yet: next frame dropped
        sink.push(WriteStep::WouldBlock);
        assert_eq!(
            writer.send(&frame(0.2)),
            SendResult::Dropped(DropReason::ChannelFull)
        );

        // tail flushed, then the new frame goes out
        assert_eq!(writer.send(&frame(0.3)), SendResult::Sent);

        let mut expected = encode_frame(&frame(0.1)).to_vec();
        expected.extend_from_slice(&encode_frame(&frame(0.3)));
        assert_eq!(sink.written(), expected);
    }

    #[test]
    fn test_broken_pipe_is_permanent() {
        let sink = MockSink::default();
        let mut writer = writer(&sink);
        sink.push(WriteStep::Broken);

        assert_eq!(
            writer.send(&frame(0.1)),
            SendResult::Dropped(DropReason::ChannelUnavailable)
        );
        assert!(!writer.is_available());
        assert_eq!(
            writer.send(&frame(0.2)),
            SendResult::Dropped(DropReason::ChannelUnavailable)
        );
        assert!(sink.written().is_empty());
    }

    #[test]
    fn test_connect_to_missing_pipe_is_unavailable() {
        let name = std::env::temp_dir()
            .join(format!("glove_bridge_missing_{}.sock", std::process::id()));
        #[cfg(windows)]
        let name = std::path::PathBuf::from(format!(
            r"\\.\pipe\glove_bridge_missing_{}",
            std::process::id()
        ));

        let mut writer = TransportWriter::connect(Side::Left, &name.to_string_lossy());
        assert!(!writer.is_available());
        assert_eq!(
            writer.send(&frame(0.1)),
            SendResult::Dropped(DropReason::ChannelUnavailable)
        );
    }
}
