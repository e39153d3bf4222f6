//! Per-side glove session
//!
//! Owns the glove handle for one side. A session without a handle is a
//! normal "glove absent" state; reads against it are simply skipped by the
//! caller and reopening is rate limited by the reconnect interval.

use crate::domain::codec::{RawReport, REPORT_LEN};
use crate::domain::models::{DeviceId, DeviceIdentity, Side};
use crate::infrastructure::device::{DeviceHandle, DeviceTransport, TransportError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadFailure {
    #[error("no report within the read timeout")]
    Timeout,
    #[error("glove disconnected")]
    Disconnected,
    /// Fewer bytes than a full report arrived; the report is discarded.
    #[error("short report ({0} of {len} bytes)", len = REPORT_LEN)]
    ShortReport(usize),
    /// One transfer failed but the glove is still attached.
    #[error("transfer failed: {0}")]
    Transfer(String),
}

pub struct DeviceSession<T: DeviceTransport> {
    side: Side,
    id: DeviceId,
    transport: T,
    handle: Option<T::Handle>,
    reconnect_interval: Duration,
    last_open_attempt: Option<Instant>,
}

impl<T: DeviceTransport> DeviceSession<T> {
    /// Try to open the glove for `side`. Never fails: an absent glove yields a
    /// disconnected session.
    pub fn open(side: Side, id: DeviceId, transport: T, reconnect_interval: Duration) -> Self {
        let handle = transport.open(id);
        Self {
            side,
            id,
            transport,
            handle,
            reconnect_interval,
            last_open_attempt: Some(Instant::now()),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn device_id(&self) -> DeviceId {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Read the next report, blocking at most `timeout`.
    ///
    /// A lost device drops the handle and reports `Disconnected`; a failed
    /// transfer only discards this read.
    pub fn read_next(&mut self, timeout: Duration) -> Result<RawReport, ReadFailure> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(ReadFailure::Disconnected);
        };

        let mut buf = [0u8; REPORT_LEN];
        match handle.read(&mut buf, timeout) {
            Ok(0) => Err(ReadFailure::Timeout),
            Ok(n) if n < REPORT_LEN => Err(ReadFailure::ShortReport(n)),
            Ok(_) => Ok(RawReport::new(buf)),
            Err(TransportError::Transfer(reason)) => {
                debug!("{} glove transfer failed: {}", self.side, reason);
                Err(ReadFailure::Transfer(reason))
            }
            Err(e @ TransportError::Disconnected(_)) => {
                warn!("{} glove {}", self.side, e);
                self.mark_disconnected(Instant::now());
                Err(ReadFailure::Disconnected)
            }
        }
    }

    /// Release the handle and start the reconnect back-off from `now`.
    pub fn mark_disconnected(&mut self, now: Instant) {
        self.handle = None;
        self.last_open_attempt = Some(now);
    }

    /// Reopen the glove if it is absent and the reconnect interval has elapsed
    /// since the last attempt. Returns true when a new handle was acquired.
    pub fn poll_reconnect(&mut self, now: Instant) -> bool {
        if self.is_connected() {
            return false;
        }
        if let Some(last) = self.last_open_attempt {
            if now.saturating_duration_since(last) < self.reconnect_interval {
                return false;
            }
        }

        self.last_open_attempt = Some(now);
        debug!("Looking for {} glove ({})", self.side, self.id);
        self.handle = self.transport.open(self.id);

        if self.handle.is_some() {
            info!("{} glove reconnected ({})", self.side, self.id);
            true
        } else {
            false
        }
    }

    /// Descriptor strings of the connected glove. Empty strings where a query
    /// failed or no glove is connected.
    pub fn identity(&self) -> DeviceIdentity {
        match &self.handle {
            Some(handle) => DeviceIdentity {
                manufacturer: handle.manufacturer().unwrap_or_default(),
                product: handle.product().unwrap_or_default(),
                serial_number: handle.serial_number().unwrap_or_default(),
            },
            None => DeviceIdentity::default(),
        }
    }

    pub fn indexed_string(&self, index: u8) -> String {
        self.handle
            .as_ref()
            .and_then(|handle| handle.indexed_string(index))
            .unwrap_or_default()
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{MockTransport, Step};
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(1);
    const TIMEOUT: Duration = Duration::from_millis(15);

    fn session(transport: &MockTransport) -> DeviceSession<MockTransport> {
        DeviceSession::open(
            Side::Left,
            DeviceId::glove(Side::Left),
            transport.clone(),
            INTERVAL,
        )
    }

    #[test]
    fn test_absent_device_is_not_an_error() {
        let transport = MockTransport::new(false);
        let mut session = session(&transport);
        assert!(!session.is_connected());
        assert_eq!(session.identity(), DeviceIdentity::default());
        assert_eq!(session.read_next(TIMEOUT), Err(ReadFailure::Disconnected));
    }

    #[test]
    fn test_read_results() {
        let transport = MockTransport::new(true);
        let mut session = session(&transport);
        assert!(session.is_connected());

        let mut bytes = [0u8; REPORT_LEN];
        bytes[0] = 0x02;
        transport.push(Step::Report(bytes));
        transport.push(Step::Timeout);
        transport.push(Step::Bytes(10));

        assert_eq!(session.read_next(TIMEOUT).unwrap().header(), 0x02);
        assert_eq!(session.read_next(TIMEOUT), Err(ReadFailure::Timeout));
        assert_eq!(session.read_next(TIMEOUT), Err(ReadFailure::ShortReport(10)));
        assert!(session.is_connected());
    }

    #[test]
    fn test_transfer_error_keeps_handle() {
        let transport = MockTransport::new(true);
        let mut session = session(&transport);

        transport.push(Step::TransferError);
        transport.push(Step::Report([0u8; REPORT_LEN]));

        assert_eq!(
            session.read_next(TIMEOUT),
            Err(ReadFailure::Transfer("overflow".into()))
        );
        assert!(session.is_connected());
        assert!(session.read_next(TIMEOUT).is_ok());
        assert_eq!(transport.open_calls(), 1);
    }

    #[test]
    fn test_short_report_message() {
        assert_eq!(
            ReadFailure::ShortReport(10).to_string(),
            "short report (10 of 25 bytes)"
        );
    }

    #[test]
    fn test_identity_strings() {
        let transport = MockTransport::new(true);
        let session = session(&transport);
        let identity = session.identity();
        assert_eq!(identity.manufacturer, "Mock Inc.");
        assert_eq!(identity.product, "Mock Glove");
        assert_eq!(identity.serial_number, "0001");
        assert_eq!(session.indexed_string(4), "string 4");

        transport.state.borrow_mut().strings_fail = true;
        assert_eq!(session.identity(), DeviceIdentity::default());
        assert_eq!(session.indexed_string(4), "");
    }

    #[test]
    fn test_disconnect_and_reconnect_interval() {
        let transport = MockTransport::new(true);
        let mut session = session(&transport);
        assert_eq!(transport.open_calls(), 1);

        transport.push(Step::Disconnect);
        assert_eq!(session.read_next(TIMEOUT), Err(ReadFailure::Disconnected));
        assert!(!session.is_connected());

        let disconnected_at = session.last_open_attempt.unwrap();

        // within the interval: no open attempt
        assert!(!session.poll_reconnect(disconnected_at + INTERVAL / 2));
        assert_eq!(transport.open_calls(), 1);

        // interval elapsed but glove still absent
        let first_retry = disconnected_at + INTERVAL;
        assert!(!session.poll_reconnect(first_retry));
        assert_eq!(transport.open_calls(), 2);

        // next attempt is another full interval away
        assert!(!session.poll_reconnect(first_retry + INTERVAL / 2));
        assert_eq!(transport.open_calls(), 2);

        transport.set_present(true);
        assert!(session.poll_reconnect(first_retry + INTERVAL * 3));
        assert!(session.is_connected());
        assert_eq!(transport.open_calls(), 3);

        // connected sessions never reopen
        assert!(!session.poll_reconnect(first_retry + INTERVAL * 10));
        assert_eq!(transport.open_calls(), 3);
    }
}
