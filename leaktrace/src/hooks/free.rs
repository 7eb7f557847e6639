use core::ffi::c_void;

use log::trace;

use crate::{bootstrap, guard, header::AllocHeader, real, tracer::tracer};

/// # Safety
/// See man pages
#[inline]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    if ptr.is_null() || bootstrap::contains(ptr.cast()) {
        return;
    }
    let hdr = unsafe { AllocHeader::from_user(ptr) };
    if !unsafe { AllocHeader::is_live(hdr) } {
        // Foreign allocation (pre-interposition, other allocator) or a
        // double free with the magic already cleared: hand it through
        // untouched.
        unsafe { real::free(ptr) };
        return;
    }
    if !guard::active() {
        trace!("free - ptr: {ptr:p}");
    }
    unsafe { tracer().dealloc(ptr) }
}
