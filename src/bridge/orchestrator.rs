//! Bridge startup and main loop.

use crate::bridge::pipeline::SidePipeline;
use crate::bridge::scheduler::{FrameScheduler, RunSummary};
use crate::domain::codec::FrameInvariantError;
use crate::domain::models::Side;
use crate::domain::settings::Settings;
use crate::domain::stats::SideStats;
use crate::infrastructure::channel::TransportWriter;
use crate::infrastructure::device::{DeviceSession, DeviceTransport};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, info_span, warn};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("No gloves are connected")]
    NoDevices,
    /// A decoded frame broke its value ranges: this build and the glove
    /// firmware disagree on the report format.
    #[error("{side} glove report format mismatch: {source}")]
    WireFormatMismatch {
        side: Side,
        #[source]
        source: FrameInvariantError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub summary: RunSummary,
    pub stats: Vec<(Side, SideStats)>,
}

pub struct Bridge<T: DeviceTransport> {
    pipelines: Vec<SidePipeline<T>>,
    tick_period: Duration,
    read_timeout: Duration,
    stats_interval: Option<Duration>,
    max_ticks: Option<u64>,
}

impl<T: DeviceTransport + Clone> Bridge<T> {
    /// Validate `settings`, open both gloves and report which are present.
    /// Fails when the settings are unusable or neither glove is found; the
    /// driver pipes are connected afterwards through `open_writer`.
    pub fn start<W>(settings: &Settings, transport: T, mut open_writer: W) -> Result<Self, BridgeError>
    where
        W: FnMut(Side, &str) -> TransportWriter,
    {
        if let Err(e) = settings.validate() {
            let err = BridgeError::InvalidSettings(format!("{:#}", e));
            error!("{}", err);
            return Err(err);
        }

        let sessions: Vec<DeviceSession<T>> = Side::ALL
            .iter()
            .map(|&side| {
                let id = settings.device(side);
                let session =
                    DeviceSession::open(side, id, transport.clone(), settings.reconnect_interval());
                log_connection(&session);
                session
            })
            .collect();

        if !sessions.iter().any(|session| session.is_connected()) {
            error!("No gloves are connected!");
            return Err(BridgeError::NoDevices);
        }

        let pipelines = sessions
            .into_iter()
            .map(|session| {
                let side = session.side();
                let writer = open_writer(side, settings.pipe(side));
                if session.is_connected() && !writer.is_available() {
                    warn!("{} glove is connected but its pipe is not; its frames are dropped", side);
                }
                SidePipeline::new(session, writer).with_raw_dump(settings.dump_raw_reports)
            })
            .collect();

        Ok(Self {
            pipelines,
            tick_period: settings.tick_period(),
            read_timeout: settings.read_timeout(),
            stats_interval: settings.stats_interval(),
            max_ticks: None,
        })
    }

    /// Connect each side to its named driver pipe.
    pub fn start_with_pipes(settings: &Settings, transport: T) -> Result<Self, BridgeError> {
        Self::start(settings, transport, TransportWriter::connect)
    }
}

impl<T: DeviceTransport> Bridge<T> {
    pub fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn connected_sides(&self) -> Vec<Side> {
        self.pipelines
            .iter()
            .filter(|pipeline| pipeline.session().is_connected())
            .map(|pipeline| pipeline.side())
            .collect()
    }

    pub fn stats(&self) -> Vec<(Side, SideStats)> {
        self.pipelines
            .iter()
            .map(|pipeline| (pipeline.side(), pipeline.stats()))
            .collect()
    }

    /// Stream frames until `shutdown` is set (or `max_ticks` is reached).
    pub fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<RunReport, BridgeError> {
        let scheduler =
            FrameScheduler::new(self.tick_period, shutdown).with_max_ticks(self.max_ticks);
        info!(
            "Streaming at {:.1} Hz (read timeout {:?})",
            1.0 / self.tick_period.as_secs_f64(),
            self.read_timeout
        );

        let read_timeout = self.read_timeout;
        let stats_interval = self.stats_interval;
        let pipelines = &mut self.pipelines;
        let mut last_report = Instant::now();
        let mut reported: Vec<SideStats> = vec![SideStats::default(); pipelines.len()];

        let result = scheduler.run(|_, started| {
            for pipeline in pipelines.iter_mut() {
                pipeline
                    .tick(started, read_timeout)
                    .map_err(|source| BridgeError::WireFormatMismatch {
                        side: pipeline.side(),
                        source,
                    })?;
            }

            if let Some(interval) = stats_interval {
                if started.saturating_duration_since(last_report) >= interval {
                    for (pipeline, previous) in pipelines.iter().zip(reported.iter_mut()) {
                        let current = pipeline.stats();
                        info!("{} last {:?}: {}", pipeline.side(), interval, current.since(previous));
                        *previous = current;
                    }
                    last_report = started;
                }
            }
            Ok(())
        });

        let stats = self.stats();
        for (side, side_stats) in &stats {
            info!("{} totals: {}", side, side_stats);
        }

        match result {
            Ok(summary) => {
                info!(
                    "Stopped after {} ticks ({} overruns)",
                    summary.ticks, summary.overruns
                );
                Ok(RunReport { summary, stats })
            }
            Err(e) => {
                error!("{}", e);
                Err(e)
            }
        }
    }
}

fn log_connection<T: DeviceTransport>(session: &DeviceSession<T>) {
    let side = session.side();
    let _entered = info_span!("glove", side = %side, id = %session.device_id()).entered();
    if session.is_connected() {
        let identity = session.identity();
        info!("{} glove connected ({})", side, session.device_id());
        info!("  Manufacturer: {}", identity.manufacturer);
        info!("  Product     : {}", identity.product);
        info!("  SerialNumber: {}", identity.serial_number);
    } else {
        info!("{} glove was not found ({})", side, session.device_id());
    }
}
