//! Per-side pipeline counters.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideStats {
    pub frames_sent: u64,
    pub dropped_channel_full: u64,
    pub dropped_channel_unavailable: u64,
    pub read_timeouts: u64,
    pub short_reports: u64,
    pub transfer_errors: u64,
    pub disconnects: u64,
    pub reconnects: u64,
}

impl SideStats {
    pub fn frames_dropped(&self) -> u64 {
        self.dropped_channel_full + self.dropped_channel_unavailable
    }

    /// Counters accumulated since `earlier`.
    pub fn since(&self, earlier: &SideStats) -> SideStats {
        SideStats {
            frames_sent: self.frames_sent - earlier.frames_sent,
            dropped_channel_full: self.dropped_channel_full - earlier.dropped_channel_full,
            dropped_channel_unavailable: self.dropped_channel_unavailable
                - earlier.dropped_channel_unavailable,
            read_timeouts: self.read_timeouts - earlier.read_timeouts,
            short_reports: self.short_reports - earlier.short_reports,
            transfer_errors: self.transfer_errors - earlier.transfer_errors,
            disconnects: self.disconnects - earlier.disconnects,
            reconnects: self.reconnects - earlier.reconnects,
        }
    }
}

impl fmt::Display for SideStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent={} dropped={} (full={} unavailable={}) timeouts={} short={} transfer_errors={} disconnects={} reconnects={}",
            self.frames_sent,
            self.frames_dropped(),
            self.dropped_channel_full,
            self.dropped_channel_unavailable,
            self.read_timeouts,
            self.short_reports,
            self.transfer_errors,
            self.disconnects,
            self.reconnects,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_since() {
        let earlier = SideStats {
            frames_sent: 10,
            read_timeouts: 2,
            ..Default::default()
        };
        let later = SideStats {
            frames_sent: 25,
            read_timeouts: 3,
            dropped_channel_full: 4,
            ..Default::default()
        };
        let delta = later.since(&earlier);
        assert_eq!(delta.frames_sent, 15);
        assert_eq!(delta.read_timeouts, 1);
        assert_eq!(delta.frames_dropped(), 4);
    }
}
