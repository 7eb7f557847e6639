//! # leaktrace_agent
//!
//! The preload object. Loading this library into a process (`LD_PRELOAD`)
//! interposes the four allocator entry points with the `leaktrace` hooks,
//! starts the background leak scanner, and publishes allocation events to
//! the shared-memory channel for out-of-process readers.
//!
//! Besides the allocator surface, three control symbols are exported for the
//! host or its instrumentation:
//!
//! - `set_staleness_threshold_seconds`
//! - `get_allocation_stats`
//! - `update_allocation_access`
use core::ffi::c_void;

use leaktrace::{HostAddr, guard::InternalGuard, hooks, scanner, size_t, tracer::tracer};

// Each allocator wrapper hands its own symbol address down as the anchor for
// the call-site walk: the exported function is the one frame the optimizer
// can never inline into the host, so the frame above it is the host call
// site.

/// # Safety
/// See man pages
#[unsafe(no_mangle)]
pub unsafe extern "C" fn malloc(size: size_t) -> *mut c_void {
    unsafe { hooks::malloc::malloc(size, malloc as HostAddr) }
}

/// # Safety
/// See man pages
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    unsafe { hooks::free::free(ptr) }
}

/// # Safety
/// See man pages
#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: size_t) -> *mut c_void {
    unsafe { hooks::realloc::realloc(ptr, size, realloc as HostAddr) }
}

/// # Safety
/// See man pages
#[unsafe(no_mangle)]
pub unsafe extern "C" fn calloc(nmemb: size_t, size: size_t) -> *mut c_void {
    unsafe { hooks::calloc::calloc(nmemb, size, calloc as HostAddr) }
}

/// # Safety
/// `ptr` must be null or a pointer returned by the interposed allocator.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn update_allocation_access(ptr: *mut c_void) {
    unsafe { hooks::access::update_allocation_access(ptr) }
}

/// Updates the scanner's staleness threshold. Takes effect on the next sweep.
#[unsafe(no_mangle)]
pub extern "C" fn set_staleness_threshold_seconds(seconds: f64) {
    tracer().set_staleness_threshold_seconds(seconds);
}

/// Snapshot of the running counters. Null out-pointers are skipped.
///
/// # Safety
/// Each non-null out-pointer must be valid for a `u64` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_allocation_stats(
    allocs: *mut u64,
    frees: *mut u64,
    current_mem: *mut u64,
) {
    let (a, f, c) = tracer().stats();
    unsafe {
        if !allocs.is_null() {
            *allocs = a;
        }
        if !frees.is_null() {
            *frees = f;
        }
        if !current_mem.is_null() {
            *current_mem = c;
        }
    }
}

extern "C" fn ctor() {
    // Everything the constructor allocates is the tracer's own.
    let _internal = InternalGuard::enter();
    let _ = tracer();
    scanner::spawn();
}

extern "C" fn dtor() {
    tracer().shutdown();
}

#[used]
#[unsafe(link_section = ".init_array")]
static INIT: extern "C" fn() = ctor;

#[used]
#[unsafe(link_section = ".fini_array")]
static FINI: extern "C" fn() = dtor;
