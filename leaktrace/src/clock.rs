//! # clock
//! Monotonic timestamps and thread identity. Header timestamps and event
//! timestamps both come from `now_ns` so staleness comparisons are performed
//! against a single clock.
use core::mem::MaybeUninit;

/// Nanoseconds on the monotonic clock.
pub fn now_ns() -> u64 {
    let mut ts = MaybeUninit::<libc::timespec>::uninit();
    /* CLOCK_MONOTONIC with a valid timespec cannot fail */
    let _ = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, ts.as_mut_ptr()) };
    let ts = unsafe { ts.assume_init() };
    (ts.tv_sec as u64) * 1_000_000_000 + (ts.tv_nsec as u64)
}

/// Full-width identifier of the calling thread.
pub fn thread_id() -> u64 {
    unsafe { libc::pthread_self() as u64 }
}
