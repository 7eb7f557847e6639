//! # config
//! Environment-driven configuration, read once when the tracer comes up.
//! Everything has a default suited to the demo workloads; production
//! deployments raise the staleness threshold by orders of magnitude.
use core::time::Duration;
use std::{env, ffi::CString};

use log::Level;
use spin::Lazy;

/// Name of the shared-memory object readers attach to.
pub const DEFAULT_SHM_NAME: &std::ffi::CStr = c"/ml_advanced_leak_detection";
/// Seconds between scanner sweeps.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5);
/// An allocation untouched for longer than this is reported as a leak.
pub const DEFAULT_STALENESS_NS: u64 = 3_000_000_000;

#[derive(Debug)]
pub struct Config {
    shm_name: CString,
    pub scan_interval: Duration,
    pub staleness_ns: u64,
    pub log_level: Level,
}

static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// The process-wide configuration snapshot.
pub fn get() -> &'static Config {
    &CONFIG
}

fn env_f64(name: &str) -> Option<f64> {
    env::var(name)
        .ok()
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}

impl Config {
    pub fn shm_name(&self) -> &std::ffi::CStr {
        &self.shm_name
    }

    fn from_env() -> Config {
        let shm_name = env::var("LEAKTRACE_SHM")
            .ok()
            .and_then(|name| CString::new(name).ok())
            .unwrap_or_else(|| DEFAULT_SHM_NAME.into());
        let scan_interval = env_f64("LEAKTRACE_SCAN_SECS")
            .map(Duration::from_secs_f64)
            .unwrap_or(DEFAULT_SCAN_INTERVAL);
        let staleness_ns = env_f64("LEAKTRACE_STALENESS_SECS")
            .map(|secs| (secs * 1e9) as u64)
            .unwrap_or(DEFAULT_STALENESS_NS);
        let log_level = env::var("LEAKTRACE_LOG")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(Level::Info);
        Config {
            shm_name,
            scan_interval,
            staleness_ns,
            log_level,
        }
    }
}
