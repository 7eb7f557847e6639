use core::{ffi::c_void, ptr::null_mut};

use libc::size_t;
use log::trace;

use crate::{HostAddr, bootstrap, guard, guard::InternalGuard, real, site, tracer::tracer};

/// # Safety
/// See man pages. `entry` is the address of the exported entry point whose
/// stack frame the call-site walk anchors on; zero disables the fingerprint.
#[inline]
pub unsafe extern "C" fn malloc(size: size_t, entry: HostAddr) -> *mut c_void {
    if size == 0 {
        return null_mut();
    }
    if guard::active() {
        // The tracer's own machinery allocating: serve raw, headerless.
        return match real::cached_malloc() {
            Some(fn_malloc) => unsafe { fn_malloc(size) },
            None => bootstrap::alloc(size).cast(),
        };
    }
    let site = {
        let _internal = InternalGuard::enter();
        site::site_id(entry)
    };
    trace!("malloc - size: {size:#x}");
    unsafe { tracer().alloc(size, site) }
}
