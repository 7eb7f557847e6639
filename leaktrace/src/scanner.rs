//! # scanner
//! The background sweep. Every scan interval the scanner walks the active
//! set, validates each header's magic, and reports every allocation whose
//! last access is older than the staleness threshold. Reported entries stay
//! in the set: a leak candidate is still a live allocation and may yet be
//! freed, at which point the usual free path removes it.
use std::thread;

use log::{info, warn};

use crate::{
    channel::LeakInfo,
    clock, config,
    header::AllocHeader,
    tracer::{LeakTracer, tracer},
};

/// What one sweep saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Tracked entries whose header still carried a live magic.
    pub live: usize,
    /// Of those, how many exceeded the staleness threshold.
    pub leaked: usize,
}

/// Starts the detached scanner thread. The thread runs until process exit.
pub fn spawn() {
    let interval = config::get().scan_interval;
    let spawned = thread::Builder::new()
        .name("leaktrace-scanner".into())
        .spawn(move || {
            loop {
                thread::sleep(interval);
                let report = sweep_once(tracer());
                let (_, _, current) = tracer().stats();
                info!(
                    "scan: {} live allocations, {:.2} MB tracked, {} leak candidates",
                    report.live,
                    current as f64 / (1024.0 * 1024.0),
                    report.leaked
                );
            }
        });
    if let Err(e) = spawned {
        warn!("failed to start scanner thread: {e}");
    }
}

/// One pass over the active set. Callable directly so the sweep can be
/// driven without the timer thread.
pub fn sweep_once(tracer: &LeakTracer) -> SweepReport {
    let now = clock::now_ns();
    let threshold = tracer.staleness_threshold_ns();
    let mut report = SweepReport { live: 0, leaked: 0 };
    tracer.registry().sweep(|entry| {
        let hdr = entry.header as *const AllocHeader;
        // Entries whose free raced this sweep show a cleared magic; skip.
        if !unsafe { AllocHeader::is_live(hdr) } {
            return;
        }
        report.live += 1;
        let staleness = now.saturating_sub(unsafe { AllocHeader::last_access(hdr) });
        if staleness > threshold {
            report.leaked += 1;
            let size = unsafe { AllocHeader::request_size(hdr) };
            let site = unsafe { AllocHeader::site(hdr) };
            tracer.report_leak(LeakInfo::new(entry.user, size, staleness, site));
            warn!(
                "leak candidate: {:#x}, {} bytes, stale for {:.2}s, site {:#06x}",
                entry.user,
                size,
                staleness as f64 / 1e9,
                site
            );
        }
    });
    report
}
