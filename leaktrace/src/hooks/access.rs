use core::ffi::c_void;

use crate::{clock, header::AllocHeader};

/// Marks the allocation holding `ptr` as accessed now. Exported for whatever
/// sampling mechanism the host wires up (perf hooks, instrumented reads);
/// a pointer without a live header is ignored.
///
/// # Safety
/// `ptr` must be null or a pointer previously returned by the interposed
/// allocator entry points.
#[inline]
pub unsafe extern "C" fn update_allocation_access(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    let hdr = unsafe { AllocHeader::from_user(ptr) };
    if unsafe { AllocHeader::is_live(hdr) } {
        unsafe { AllocHeader::touch(hdr, clock::now_ns()) };
    }
}
