//! # site
//! Compact fingerprints of allocation sites. The fingerprint folds the
//! return address of the interposed entry point - the instruction the host
//! program resumes at after `malloc` returns - to 16 bits, so an external
//! analyzer can group allocations by the location which made them without
//! any symbol information.
//!
//! The frame walk anchors on the entry point's own symbol instead of a
//! fixed skip count, so the captured frame does not depend on what the
//! optimizer inlines between the exported symbol and the capture.
use crate::HostAddr;

/// Fingerprint of the active allocation site.
///
/// `entry` is the address of the function owning the entry-point stack
/// frame (the exported `malloc`/`realloc`/`calloc` symbol, which is never
/// inlined into its callers). Frames below it - unwinder internals and any
/// hook frames the optimizer chose not to inline - are skipped by comparing
/// each frame's enclosing function against `entry`; the frame above the
/// match is the host call site, whose instruction pointer is folded to 16
/// bits. A zero or never-found `entry` degrades to fingerprint zero.
///
/// Walks the stack without touching the symbol cache; no allocation on this
/// path.
pub fn site_id(entry: HostAddr) -> u16 {
    if entry == 0 {
        return 0;
    }
    let mut entry_seen = false;
    let mut ip: HostAddr = 0;
    unsafe {
        backtrace::trace_unsynchronized(|frame| {
            if entry_seen {
                ip = frame.ip() as HostAddr;
                false
            } else {
                entry_seen = frame.symbol_address() as HostAddr == entry;
                true
            }
        });
    }
    fold_address(ip)
}

/// `(addr >> 4) & 0xFFFF`: drops alignment bits, keeps enough entropy to
/// distinguish call sites within a compilation unit.
pub fn fold_address(addr: HostAddr) -> u16 {
    ((addr >> 4) & 0xffff) as u16
}

#[cfg(test)]
mod tests {
    use core::hint::black_box;

    use super::*;

    /// Stands in for an exported allocator symbol.
    #[inline(never)]
    extern "C" fn probe() -> u16 {
        site_id(probe as HostAddr)
    }

    #[inline(never)]
    fn probe_from_a() -> u16 {
        probe()
    }

    // Body differs from `probe_from_a` so the two functions cannot share an
    // address.
    #[inline(never)]
    fn probe_from_b() -> u16 {
        black_box(0u32);
        probe()
    }

    #[test]
    fn test_fold_address() {
        assert_eq!(fold_address(0), 0);
        assert_eq!(fold_address(0x10), 1);
        assert_eq!(fold_address(0xdead_beef), 0xdbee);
        assert_eq!(fold_address(HostAddr::MAX), 0xffff);
    }

    #[test]
    fn test_same_site_same_id() {
        assert_eq!(probe_from_a(), probe_from_a());
    }

    #[test]
    fn test_distinct_sites_distinct_ids() {
        assert_ne!(probe_from_a(), probe_from_b());
    }

    #[test]
    fn test_missing_entry_degrades_to_zero() {
        assert_eq!(site_id(0), 0);
        // An address no frame's enclosing function can match.
        assert_eq!(site_id(1), 0);
    }
}
