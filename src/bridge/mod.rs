//! Bridge Module
//!
//! Streams glove reports to the VR driver.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                        Bridge                        │
//! │   (startup, connection report, stats, main loop)     │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ one tick
//!                            ▼
//!                   ┌─────────────────┐
//!                   │ FrameScheduler  │
//!                   └────────┬────────┘
//!              ┌─────────────┴─────────────┐
//!              ▼                           ▼
//!     ┌──────────────────┐        ┌──────────────────┐
//!     │ SidePipeline (L) │        │ SidePipeline (R) │
//!     │ session -> codec │        │ session -> codec │
//!     │   -> writer      │        │   -> writer      │
//!     └──────────────────┘        └──────────────────┘
//! ```
//!
//! Both sides run sequentially on the scheduler thread and share nothing.
//!
//! ## Modules
//!
//! - [`scheduler`] - Drift-free fixed-rate loop
//! - [`pipeline`] - Per-side read/decode/send
//! - [`orchestrator`] - Startup and run loop

pub mod orchestrator;
pub mod pipeline;
pub mod scheduler;

pub use orchestrator::{Bridge, BridgeError, RunReport};
pub use pipeline::{SidePipeline, TickOutcome};
pub use scheduler::{FrameScheduler, RunSummary};
