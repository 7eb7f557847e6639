use core::{
    ffi::c_void,
    ptr::{null_mut, write_bytes},
};

use libc::size_t;

use crate::HostAddr;

use super::malloc::malloc;

/// # Safety
/// See man pages. `entry` is the address of the exported entry point whose
/// stack frame the call-site walk anchors on; zero disables the fingerprint.
#[inline]
pub unsafe extern "C" fn calloc(nmemb: size_t, size: size_t, entry: HostAddr) -> *mut c_void {
    // An overflowing element count is an allocation failure, not a wrap.
    let Some(total) = nmemb.checked_mul(size) else {
        return null_mut();
    };
    let ptr = unsafe { malloc(total, entry) };
    if !ptr.is_null() {
        unsafe { write_bytes(ptr as *mut u8, 0, total) };
    }
    ptr
}
