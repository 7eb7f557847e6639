//! # shm
//! Named POSIX shared memory. The tracer creates one object at startup, sized
//! for the event ring, and unlinks it again at process exit; external readers
//! open the same name read-only from their side. Failure here is non-fatal:
//! the tracer keeps working without a channel.
use core::{ffi::c_void, ptr, ptr::null_mut};
use std::ffi::{CStr, CString};

use libc::{MAP_FAILED, MAP_SHARED, O_CREAT, O_RDWR, PROT_READ, PROT_WRITE, c_int};
use log::trace;
use thiserror::Error;

fn errno() -> c_int {
    unsafe { *libc::__errno_location() }
}

#[derive(Debug)]
pub struct ShMem {
    name: CString,
    fd: c_int,
    addr: *mut c_void,
    len: usize,
    /// Owners unlink the name on drop; attached readers leave it alone.
    owner: bool,
}

// The mapping is plain memory shared with other processes; all tracer-side
// access goes through atomics or slot ownership (see channel).
unsafe impl Send for ShMem {}
unsafe impl Sync for ShMem {}

impl ShMem {
    /// Creates (or reopens) the object, sizes it and maps it read/write. The
    /// mapping is zeroed so stale events from an earlier run cannot leak into
    /// this one.
    pub fn create(name: &CStr, len: usize) -> Result<ShMem, ShMemError> {
        let map = Self::map(name, len, true)?;
        unsafe { ptr::write_bytes(map.addr as *mut u8, 0, len) };
        trace!("created shared memory {:?}, {} bytes", map.name, len);
        Ok(map)
    }

    /// Maps an object created by somebody else, without zeroing.
    pub fn attach(name: &CStr, len: usize) -> Result<ShMem, ShMemError> {
        Self::map(name, len, false)
    }

    fn map(name: &CStr, len: usize, owner: bool) -> Result<ShMem, ShMemError> {
        let flags = if owner { O_CREAT | O_RDWR } else { O_RDWR };
        let fd = unsafe { libc::shm_open(name.as_ptr(), flags, 0o666) };
        if fd < 0 {
            Err(ShMemError::Open(name.into(), errno()))?;
        }
        if owner && unsafe { libc::ftruncate(fd, len as libc::off_t) } != 0 {
            let e = errno();
            unsafe { libc::close(fd) };
            Err(ShMemError::Truncate(len, e))?;
        }
        let addr = unsafe {
            libc::mmap(
                null_mut(),
                len,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                fd,
                0,
            )
        };
        if addr == MAP_FAILED {
            let e = errno();
            unsafe { libc::close(fd) };
            Err(ShMemError::Map(len, e))?;
        }
        Ok(ShMem {
            name: name.into(),
            fd,
            addr,
            len,
            owner,
        })
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.addr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn name(&self) -> &CStr {
        &self.name
    }
}

impl Drop for ShMem {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::munmap(self.addr, self.len);
            let _ = libc::close(self.fd);
            if self.owner {
                let _ = libc::shm_unlink(self.name.as_ptr());
            }
        }
        trace!("released shared memory {:?}", self.name);
    }
}

#[derive(Error, Debug)]
pub enum ShMemError {
    #[error("Failed to open shared memory object {0:?}, errno: {1}")]
    Open(CString, c_int),
    #[error("Failed to size shared memory object to {0} bytes, errno: {1}")]
    Truncate(usize, c_int),
    #[error("Failed to map {0} bytes of shared memory, errno: {1}")]
    Map(usize, c_int),
}
