mod cli;

use clap::Parser;
use cli::Args;
use glove_bridge::bridge::{Bridge, BridgeError};
use glove_bridge::infrastructure::device::UsbHidTransport;
use glove_bridge::infrastructure::logging;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Neither glove found, or unusable settings.
const EXIT_NO_DEVICES: u8 = 1;
/// Glove firmware and this build disagree on the report format.
const EXIT_WIRE_MISMATCH: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();

    let service = match args.load_settings() {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to load settings: {:#}", e);
            return ExitCode::from(EXIT_NO_DEVICES);
        }
    };
    let settings = service.get();

    if args.print_config {
        eprintln!("Settings file: {}", service.path().display());
        match serde_json::to_string_pretty(settings) {
            Ok(json) => {
                println!("{}", json);
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                eprintln!("Failed to serialize settings: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    if args.save_config {
        return match service.save() {
            Ok(()) => {
                eprintln!("Settings written to {}", service.path().display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to save settings: {:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    let _logging_guard = logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting Glove Bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("Settings file: {}", service.path().display());

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Release);
    }) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }

    // startup errors are logged by the bridge
    let mut bridge = match Bridge::start_with_pipes(settings, UsbHidTransport) {
        Ok(bridge) => bridge.with_max_ticks(args.max_ticks),
        Err(_) => return ExitCode::from(EXIT_NO_DEVICES),
    };

    info!("Streaming gloves: {:?}", bridge.connected_sides());
    info!("Press Ctrl+C to stop.");
    match bridge.run(shutdown) {
        Ok(_) => ExitCode::SUCCESS,
        Err(BridgeError::WireFormatMismatch { .. }) => ExitCode::from(EXIT_WIRE_MISMATCH),
        Err(BridgeError::NoDevices | BridgeError::InvalidSettings(_)) => {
            ExitCode::from(EXIT_NO_DEVICES)
        }
    }
}
