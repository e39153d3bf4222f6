use crate::domain::models::{DeviceId, Side};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
    /// Write raw report dumps to `<prefix>.raw` instead of the regular log
    #[serde(default = "default_false")]
    pub raw_report_file_enabled: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
            raw_report_file_enabled: default_false(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "glove_bridge".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Polling rate of the frame loop
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,
    /// Per-side read timeout; one tick period when unset
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
    /// Minimum time between open attempts for an absent glove
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    /// Period of the per-side counter summary, 0 disables it
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,

    // Devices
    #[serde(default = "default_left_device")]
    pub left_device: DeviceId,
    #[serde(default = "default_right_device")]
    pub right_device: DeviceId,

    // Driver pipes
    #[serde(default = "default_left_pipe")]
    pub left_pipe: String,
    #[serde(default = "default_right_pipe")]
    pub right_pipe: String,

    // Debug Settings
    #[serde(default = "default_false")]
    pub dump_raw_reports: bool,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            read_timeout_ms: None,
            reconnect_interval_ms: default_reconnect_interval_ms(),
            stats_interval_secs: default_stats_interval_secs(),
            left_device: default_left_device(),
            right_device: default_right_device(),
            left_pipe: default_left_pipe(),
            right_pipe: default_right_pipe(),
            dump_raw_reports: false,
            log_settings: LogSettings::default(),
        }
    }
}

fn default_rate_hz() -> f64 {
    67.0
}
fn default_reconnect_interval_ms() -> u64 {
    1000
}
fn default_stats_interval_secs() -> u64 {
    10
}
fn default_left_device() -> DeviceId {
    DeviceId::glove(Side::Left)
}
fn default_right_device() -> DeviceId {
    DeviceId::glove(Side::Right)
}

#[cfg(windows)]
fn default_left_pipe() -> String {
    r"\\.\pipe\vrapplication\input\glove\v2\left".to_string()
}
#[cfg(windows)]
fn default_right_pipe() -> String {
    r"\\.\pipe\vrapplication\input\glove\v2\right".to_string()
}
#[cfg(not(windows))]
fn default_left_pipe() -> String {
    "/tmp/vrapplication.input.glove.v2.left.sock".to_string()
}
#[cfg(not(windows))]
fn default_right_pipe() -> String {
    "/tmp/vrapplication.input.glove.v2.right.sock".to_string()
}

/// Upper bound on the polling rate; HID interrupt endpoints poll at 1 kHz at best.
pub const MAX_RATE_HZ: f64 = 1000.0;

impl Settings {
    pub fn device(&self, side: Side) -> DeviceId {
        match side {
            Side::Left => self.left_device,
            Side::Right => self.right_device,
        }
    }

    pub fn pipe(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_pipe,
            Side::Right => &self.right_pipe,
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz)
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.tick_period())
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.rate_hz.is_finite() || self.rate_hz <= 0.0 {
            anyhow::bail!("rate_hz must be a positive number, got {}", self.rate_hz);
        }
        if self.rate_hz > MAX_RATE_HZ {
            anyhow::bail!("rate_hz {} exceeds {} Hz", self.rate_hz, MAX_RATE_HZ);
        }
        if self.reconnect_interval_ms == 0 {
            anyhow::bail!("reconnect_interval_ms must be greater than zero");
        }
        if self.left_pipe.is_empty() || self.right_pipe.is_empty() {
            anyhow::bail!("pipe names must not be empty");
        }
        if self.left_device == self.right_device {
            anyhow::bail!(
                "left and right gloves share the same device id {}",
                self.left_device
            );
        }
        Ok(())
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    /// Load settings from the per-user config directory, falling back to defaults.
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    /// Load settings from an explicit file. Unlike [`SettingsService::new`], a
    /// missing or malformed file is an error.
    pub fn load_from(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let settings_path = path.into();
        let settings = Self::load_from_file(&settings_path).map_err(|e| {
            anyhow::anyhow!("Failed to load settings from {}: {}", settings_path.display(), e)
        })?;

        Ok(Self {
            settings,
            settings_path,
        })
    }

    /// Default settings bound to `path`, for writing a fresh settings file.
    pub fn with_defaults(path: impl Into<PathBuf>) -> Self {
        Self {
            settings: Settings::default(),
            settings_path: path.into(),
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("GloveBridge");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("glove_bridge_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rate_hz, 67.0);
        assert_eq!(settings.left_device, DeviceId::new(0x1915, 0xEEE1));
        assert_eq!(settings.right_device, DeviceId::new(0x1915, 0xEEE0));
        assert_eq!(settings.read_timeout(), settings.tick_period());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_tick_period() {
        let settings = Settings::default();
        let period = settings.tick_period();
        assert!(period > Duration::from_micros(14_900));
        assert!(period < Duration::from_micros(14_950));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "rate_hz": 90.0, "read_timeout_ms": 5 }"#).unwrap();
        assert_eq!(settings.rate_hz, 90.0);
        assert_eq!(settings.read_timeout(), Duration::from_millis(5));
        assert_eq!(settings.reconnect_interval(), Duration::from_secs(1));
        assert_eq!(settings.log_settings.level, "info");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.rate_hz = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.rate_hz = f64::NAN;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.rate_hz = 5000.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.right_device = settings.left_device;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.left_pipe.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_load_from() {
        let path = temp_file("settings.json");
        let mut service = SettingsService::with_defaults(&path);
        service.get_mut().rate_hz = 50.0;
        service.get_mut().dump_raw_reports = true;
        service.save().unwrap();

        let loaded = SettingsService::load_from(&path).unwrap();
        assert_eq!(loaded.get().rate_hz, 50.0);
        assert!(loaded.get().dump_raw_reports);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        assert!(SettingsService::load_from(temp_file("missing.json")).is_err());
    }
}
