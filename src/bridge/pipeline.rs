//! One side's read -> decode -> send chain.

use crate::domain::codec::{self, FrameInvariantError};
use crate::domain::models::Side;
use crate::domain::stats::SideStats;
use crate::infrastructure::channel::{DropReason, SendResult, TransportWriter};
use crate::infrastructure::device::{DeviceSession, DeviceTransport, ReadFailure};
use crate::infrastructure::logging::RAW_REPORT_TARGET;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, trace, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Glove absent; nothing was read.
    Skipped,
    /// The read produced no usable report.
    NoReport(ReadOutcome),
    Sent,
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Timeout,
    ShortReport,
    TransferError,
    Disconnected,
}

pub struct SidePipeline<T: DeviceTransport> {
    session: DeviceSession<T>,
    writer: TransportWriter,
    stats: SideStats,
    dump_raw: bool,
    span: Span,
}

impl<T: DeviceTransport> SidePipeline<T> {
    pub fn new(session: DeviceSession<T>, writer: TransportWriter) -> Self {
        let span = info_span!("glove", side = %session.side(), id = %session.device_id());
        Self {
            session,
            writer,
            stats: SideStats::default(),
            dump_raw: false,
            span,
        }
    }

    /// Log every raw report before decoding.
    pub fn with_raw_dump(mut self, dump_raw: bool) -> Self {
        self.dump_raw = dump_raw;
        self
    }

    pub fn side(&self) -> Side {
        self.session.side()
    }

    pub fn session(&self) -> &DeviceSession<T> {
        &self.session
    }

    pub fn stats(&self) -> SideStats {
        self.stats
    }

    /// Run one tick for this side.
    ///
    /// A disconnected side only gets a (rate limited) reconnect attempt and is
    /// otherwise skipped. The only error is a decoded frame that violates its
    /// value ranges, which means the firmware speaks a different report format.
    pub fn tick(
        &mut self,
        now: Instant,
        read_timeout: Duration,
    ) -> Result<TickOutcome, FrameInvariantError> {
        let side = self.session.side();
        let _entered = self.span.enter();

        if !self.session.is_connected() {
            if self.session.poll_reconnect(now) {
                self.stats.reconnects += 1;
            }
            return Ok(TickOutcome::Skipped);
        }

        let report = match self.session.read_next(read_timeout) {
            Ok(report) => report,
            Err(ReadFailure::Timeout) => {
                self.stats.read_timeouts += 1;
                trace!("read timed out");
                return Ok(TickOutcome::NoReport(ReadOutcome::Timeout));
            }
            Err(e @ ReadFailure::ShortReport(_)) => {
                self.stats.short_reports += 1;
                debug!("discarded report: {}", e);
                return Ok(TickOutcome::NoReport(ReadOutcome::ShortReport));
            }
            Err(ReadFailure::Transfer(_)) => {
                self.stats.transfer_errors += 1;
                return Ok(TickOutcome::NoReport(ReadOutcome::TransferError));
            }
            Err(ReadFailure::Disconnected) => {
                self.stats.disconnects += 1;
                return Ok(TickOutcome::NoReport(ReadOutcome::Disconnected));
            }
        };

        if self.dump_raw {
            info!(target: RAW_REPORT_TARGET, "report: {:02X?}", report.as_bytes());
        }

        let frame = codec::decode(&report, side);
        codec::validate(&frame)?;

        match self.writer.send(&frame) {
            SendResult::Sent => {
                self.stats.frames_sent += 1;
                Ok(TickOutcome::Sent)
            }
            SendResult::Dropped(reason) => {
                match reason {
                    DropReason::ChannelFull => self.stats.dropped_channel_full += 1,
                    DropReason::ChannelUnavailable => {
                        self.stats.dropped_channel_unavailable += 1
                    }
                }
                trace!("frame dropped: {}", reason);
                Ok(TickOutcome::Dropped(reason))
            }
        }
    }
}
