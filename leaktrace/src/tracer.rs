//! # tracer
//! The process-wide tracer object. All interposed entry points and the
//! scanner funnel through one `LeakTracer` held in a `spin::Lazy`: the
//! `leaktrace_agent` constructor forces it at load time, and a `malloc`
//! arriving before the constructor (other preloaded objects, dynamic linker
//! internals) initializes it on demand instead.
use core::{
    ffi::c_void,
    ptr::null_mut,
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
};

use log::{info, warn};
use spin::{Lazy, RwLock};

use crate::{
    HostAddr,
    channel::{AllocInfo, EventChannel, EventKind, EventPayload, LeakInfo},
    clock, config,
    guard::InternalGuard,
    header::AllocHeader,
    logger::StderrLogger,
    real,
    registry::ActiveSet,
};

pub struct LeakTracer {
    registry: ActiveSet,
    channel: RwLock<Option<EventChannel>>,
    total_allocations: AtomicU64,
    total_frees: AtomicU64,
    current_memory: AtomicU64,
    staleness_ns: AtomicU64,
    next_event_id: AtomicU32,
}

static TRACER: Lazy<LeakTracer> = Lazy::new(LeakTracer::initialize);

/// The process-wide tracer, initializing it on first use.
pub fn tracer() -> &'static LeakTracer {
    &TRACER
}

impl LeakTracer {
    fn initialize() -> LeakTracer {
        let _internal = InternalGuard::enter();
        // Fatal if the allocator cannot be found; everything else degrades.
        real::resolve_all();
        let cfg = config::get();
        StderrLogger::initialize(cfg.log_level);
        info!(
            "initializing: scan every {:?}, staleness threshold {}ns",
            cfg.scan_interval, cfg.staleness_ns
        );
        let channel = match EventChannel::create(cfg.shm_name()) {
            Ok(channel) => {
                info!(
                    "event channel ready: {:?}, {} bytes",
                    channel.name(),
                    crate::channel::SHM_SIZE
                );
                Some(channel)
            }
            Err(e) => {
                warn!("event channel unavailable, events disabled: {e}");
                None
            }
        };
        LeakTracer {
            registry: ActiveSet::new(),
            channel: RwLock::new(channel),
            total_allocations: AtomicU64::new(0),
            total_frees: AtomicU64::new(0),
            current_memory: AtomicU64::new(0),
            staleness_ns: AtomicU64::new(cfg.staleness_ns),
            next_event_id: AtomicU32::new(1),
        }
    }

    /// The tracked allocation path: header, registry, counters, event.
    ///
    /// # Safety
    /// Called with `size > 0` from an allocator entry point.
    pub unsafe fn alloc(&self, size: usize, site: u16) -> *mut c_void {
        let Some(total) = size.checked_add(AllocHeader::SIZE) else {
            return null_mut();
        };
        let base = unsafe { real::malloc(total) };
        if base.is_null() {
            return null_mut();
        }
        let now = clock::now_ns();
        let thread = clock::thread_id();
        let user = unsafe { AllocHeader::install(base as *mut u8, size, now, site, thread) };

        // Dropped silently when the registry is full; the allocation itself
        // must never fail on the tracer's account.
        let _ = self.registry.track(user as HostAddr, base as HostAddr);

        self.total_allocations.fetch_add(1, Ordering::Relaxed);
        self.current_memory.fetch_add(size as u64, Ordering::Relaxed);

        if let Some(channel) = self.channel.read().as_ref() {
            channel.count_alloc(size);
            channel.publish(
                self.next_event_id(),
                EventKind::Alloc,
                now,
                thread,
                EventPayload {
                    alloc: AllocInfo::new(user as HostAddr, size, now, site),
                },
            );
        }
        user
    }

    /// The tracked free path. The caller has already validated the header.
    ///
    /// # Safety
    /// `user` must carry a live header installed by [`Self::alloc`].
    pub unsafe fn dealloc(&self, user: *mut c_void) {
        let hdr = unsafe { AllocHeader::from_user(user) };
        let size = unsafe { AllocHeader::request_size(hdr) };
        let alloc_time = unsafe { AllocHeader::alloc_time(hdr) };
        let site = unsafe { AllocHeader::site(hdr) };

        self.total_frees.fetch_add(1, Ordering::Relaxed);
        self.current_memory.fetch_sub(size as u64, Ordering::Relaxed);
        let _ = self.registry.untrack(user as HostAddr);

        if let Some(channel) = self.channel.read().as_ref() {
            channel.count_free(size);
            channel.publish(
                self.next_event_id(),
                EventKind::Free,
                clock::now_ns(),
                clock::thread_id(),
                EventPayload {
                    alloc: AllocInfo::new(user as HostAddr, size, alloc_time, site),
                },
            );
        }

        unsafe {
            AllocHeader::retire(hdr);
            real::free(AllocHeader::base_ptr(hdr) as *mut c_void);
        }
    }

    /// Publishes a leak report for a still-live allocation.
    pub fn report_leak(&self, leak: LeakInfo) {
        if let Some(channel) = self.channel.read().as_ref() {
            channel.count_leak();
            channel.publish(
                self.next_event_id(),
                EventKind::Leak,
                clock::now_ns(),
                clock::thread_id(),
                EventPayload { leak },
            );
        }
    }

    fn next_event_id(&self) -> u32 {
        self.next_event_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn registry(&self) -> &ActiveSet {
        &self.registry
    }

    /// (allocations, frees, current bytes).
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.total_allocations.load(Ordering::Relaxed),
            self.total_frees.load(Ordering::Relaxed),
            self.current_memory.load(Ordering::Relaxed),
        )
    }

    pub fn staleness_threshold_ns(&self) -> u64 {
        self.staleness_ns.load(Ordering::Relaxed)
    }

    pub fn set_staleness_threshold_ns(&self, ns: u64) {
        self.staleness_ns.store(ns, Ordering::Relaxed);
    }

    pub fn set_staleness_threshold_seconds(&self, seconds: f64) {
        if !seconds.is_finite() || seconds < 0.0 {
            warn!("ignoring invalid staleness threshold: {seconds}");
            return;
        }
        self.set_staleness_threshold_ns((seconds * 1e9) as u64);
        info!("staleness threshold set to {seconds:.2}s");
    }

    /// Logs final counters and releases the shared memory. Called from the
    /// agent destructor; the tracer keeps working channel-less afterwards.
    pub fn shutdown(&self) {
        let _internal = InternalGuard::enter();
        let (allocs, frees, current) = self.stats();
        info!("final stats: {allocs} allocations, {frees} frees, {current} bytes still tracked");
        *self.channel.write() = None;
    }
}
