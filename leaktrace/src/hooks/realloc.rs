use core::{
    ffi::c_void,
    ptr::{copy_nonoverlapping, null_mut},
};

use libc::size_t;
use log::trace;

use crate::{HostAddr, bootstrap, guard, header::AllocHeader, real};

use super::{free::free, malloc::malloc};

/// # Safety
/// See man pages. `entry` is the address of the exported entry point whose
/// stack frame the call-site walk anchors on; zero disables the fingerprint.
#[inline]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: size_t, entry: HostAddr) -> *mut c_void {
    if ptr.is_null() {
        return unsafe { malloc(size, entry) };
    }
    if size == 0 {
        unsafe { free(ptr) };
        return null_mut();
    }
    if bootstrap::contains(ptr.cast()) {
        let old_size = bootstrap::block_size(ptr.cast());
        let new = unsafe { malloc(size, entry) };
        if !new.is_null() {
            unsafe {
                copy_nonoverlapping(ptr as *const u8, new as *mut u8, old_size.min(size))
            };
        }
        return new;
    }
    let hdr = unsafe { AllocHeader::from_user(ptr) };
    if !unsafe { AllocHeader::is_live(hdr) } {
        return unsafe { real::realloc(ptr, size) };
    }
    if !guard::active() {
        trace!("realloc - ptr: {ptr:p}, size: {size:#x}");
    }
    // Always move: the fresh block carries a fresh header even where the
    // underlying realloc would have resized in place.
    let old_size = unsafe { AllocHeader::request_size(hdr) };
    let new = unsafe { malloc(size, entry) };
    if new.is_null() {
        // The old block stays valid, as the real realloc would leave it.
        return null_mut();
    }
    unsafe {
        copy_nonoverlapping(ptr as *const u8, new as *mut u8, old_size.min(size));
        free(ptr);
    }
    new
}
