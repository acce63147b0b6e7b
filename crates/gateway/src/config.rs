//! Gateway configuration from environment variables.

use std::env;
use std::time::Duration;

use chrono::NaiveTime;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen address, `SHIFTLINE_ADDR`.
    pub addr: String,
    /// SQLite URL, `DATABASE_URL`.
    pub database_url: String,
    /// Call ring timeout, `SHIFTLINE_RING_TIMEOUT_SECS`.
    pub ring_timeout: Duration,
    /// Whether the attendance automation runs, `SHIFTLINE_AUTOMATION`
    /// (set to `off`, `false`, or `0` to disable).
    pub automation_enabled: bool,
    /// Daily auto-absent run time ("HH:MM"), `SHIFTLINE_ABSENT_RUN_TIME`.
    pub absent_run_time: NaiveTime,
}

impl GatewayConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let addr = env::var("SHIFTLINE_ADDR").unwrap_or_else(|_| "127.0.0.1:8790".to_string());
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:shiftline.db?mode=rwc".to_string());

        let ring_timeout = env::var("SHIFTLINE_RING_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(45));

        let automation_enabled = match env::var("SHIFTLINE_AUTOMATION") {
            Ok(v) => !matches!(v.to_lowercase().as_str(), "off" | "false" | "0"),
            Err(_) => true,
        };

        let absent_run_time = env::var("SHIFTLINE_ABSENT_RUN_TIME")
            .ok()
            .and_then(|v| NaiveTime::parse_from_str(&v, "%H:%M").ok())
            .unwrap_or_else(|| NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default());

        Self {
            addr,
            database_url,
            ring_timeout,
            automation_enabled,
            absent_run_time,
        }
    }
}
