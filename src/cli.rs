use clap::Parser;
use glove_bridge::domain::settings::{Settings, SettingsService};
use std::path::PathBuf;

/// Glove Bridge - streams finger tracking gloves to the VR driver
#[derive(Parser, Debug)]
#[command(name = "glove-bridge")]
#[command(about = "Streams finger-tracking glove reports to the VR driver", long_about = None)]
#[command(version)]
pub struct Args {
    /// Settings file (defaults to the per-user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Polling rate in Hz
    #[arg(long)]
    pub rate_hz: Option<f64>,

    /// Log level filter (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log every raw report
    #[arg(long)]
    pub dump_raw: bool,

    /// Stop after this many ticks
    #[arg(long)]
    pub max_ticks: Option<u64>,

    /// Print the settings file path and the effective settings as JSON, then exit
    #[arg(long)]
    pub print_config: bool,

    /// Write the effective settings (with overrides) to the settings file and exit
    #[arg(long)]
    pub save_config: bool,
}

impl Args {
    /// Load the settings file and apply command-line overrides.
    ///
    /// An explicit `--config` file must exist unless it is about to be written
    /// by `--save-config`.
    pub fn load_settings(&self) -> anyhow::Result<SettingsService> {
        let mut service = match &self.config {
            Some(path) if self.save_config && !path.exists() => {
                SettingsService::with_defaults(path)
            }
            Some(path) => SettingsService::load_from(path)?,
            None => SettingsService::new()?,
        };
        self.apply(service.get_mut());
        Ok(service)
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(rate_hz) = self.rate_hz {
            settings.rate_hz = rate_hz;
        }
        if let Some(level) = &self.log_level {
            settings.log_settings.level = level.clone();
        }
        if self.dump_raw {
            settings.dump_raw_reports = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "glove-bridge",
            "--rate-hz",
            "90",
            "--log-level",
            "debug",
            "--dump-raw",
            "--max-ticks",
            "100",
        ]);
        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.rate_hz, 90.0);
        assert_eq!(settings.log_settings.level, "debug");
        assert!(settings.dump_raw_reports);
        assert_eq!(args.max_ticks, Some(100));
    }

    #[test]
    fn test_no_overrides_keeps_settings() {
        let args = Args::parse_from(["glove-bridge"]);
        let mut settings = Settings::default();
        args.apply(&mut settings);
        assert_eq!(settings.rate_hz, 67.0);
        assert!(!settings.dump_raw_reports);
    }

    #[test]
    fn test_save_config_writes_overrides() {
        let path = std::env::temp_dir().join(format!(
            "glove_bridge_{}_cli_settings.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let config = path.to_string_lossy().into_owned();

        // a missing explicit file is only accepted when saving
        let args = Args::parse_from(["glove-bridge", "--config", config.as_str()]);
        assert!(args.load_settings().is_err());

        let args = Args::parse_from([
            "glove-bridge",
            "--config",
            config.as_str(),
            "--rate-hz",
            "90",
            "--save-config",
        ]);
        let service = args.load_settings().unwrap();
        assert_eq!(service.path(), path.as_path());
        service.save().unwrap();

        let args = Args::parse_from(["glove-bridge", "--config", config.as_str()]);
        let service = args.load_settings().unwrap();
        assert_eq!(service.get().rate_hz, 90.0);

        let _ = std::fs::remove_file(&path);
    }
}
