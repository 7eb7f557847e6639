//! # header
//! The metadata block written immediately before every user buffer handed out
//! by the tracer. Given any user pointer `p`, the header lives at
//! `p - size_of::<AllocHeader>()`, which makes metadata lookup a single
//! subtraction. A magic constant distinguishes the tracer's allocations from
//! foreign ones and, once cleared on free, makes double frees detectable.
//!
//! The layout keeps the user pointer on the platform allocator's minimum
//! alignment: natural `repr(C)` ordering pads the block to 48 bytes, a
//! multiple of [`MIN_ALIGN`], which is statically asserted below.
use core::{
    ffi::c_void,
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
};

/// Marks an allocation as live and owned by this tracer.
pub const MAGIC: u32 = 0xDEAD_BEEF;

/// Minimum alignment returned by the interposed allocator.
pub const MIN_ALIGN: usize = 16;

#[repr(C)]
pub struct AllocHeader {
    /// [`MAGIC`] while live, zero once freed. Atomic: `free` clears it while
    /// the scanner may be validating the same entry.
    magic: AtomicU32,
    size: usize,
    alloc_time: u64,
    /// Atomic: refreshed by access sampling while the scanner reads it.
    last_access: AtomicU64,
    site_id: u32,
    thread_id: u64,
}

const _: () = assert!(size_of::<AllocHeader>() % MIN_ALIGN == 0);
const _: () = assert!(align_of::<AllocHeader>() <= MIN_ALIGN);

impl AllocHeader {
    pub const SIZE: usize = size_of::<AllocHeader>();

    /// Writes a fresh header at `base` and returns the user pointer.
    ///
    /// # Safety
    /// `base` must point to at least `Self::SIZE` writable bytes.
    pub unsafe fn install(
        base: *mut u8,
        size: usize,
        now: u64,
        site: u16,
        thread: u64,
    ) -> *mut c_void {
        let hdr = base as *mut AllocHeader;
        unsafe {
            hdr.write(AllocHeader {
                magic: AtomicU32::new(MAGIC),
                size,
                alloc_time: now,
                last_access: AtomicU64::new(now),
                site_id: site as u32,
                thread_id: thread,
            });
            Self::user_ptr(hdr)
        }
    }

    /// Header address for a user pointer. The inverse of [`Self::user_ptr`].
    ///
    /// # Safety
    /// `user` must be non-null; the result is only meaningful for pointers
    /// produced by the tracer, anything else must be filtered with
    /// [`Self::is_live`].
    pub unsafe fn from_user(user: *mut c_void) -> *mut AllocHeader {
        unsafe { (user as *mut AllocHeader).sub(1) }
    }

    /// # Safety
    /// `hdr` must point to a header.
    pub unsafe fn user_ptr(hdr: *mut AllocHeader) -> *mut c_void {
        unsafe { hdr.add(1) as *mut c_void }
    }

    /// The pointer the underlying allocator knows this block by.
    pub fn base_ptr(hdr: *mut AllocHeader) -> *mut u8 {
        hdr as *mut u8
    }

    /// # Safety
    /// `hdr` must be dereferenceable for at least the magic word.
    pub unsafe fn is_live(hdr: *const AllocHeader) -> bool {
        !hdr.is_null() && unsafe { (*hdr).magic.load(Ordering::Acquire) == MAGIC }
    }

    /// Clears the magic so a second free of the same pointer is recognisable.
    ///
    /// # Safety
    /// `hdr` must point to a live header.
    pub unsafe fn retire(hdr: *mut AllocHeader) {
        unsafe { (*hdr).magic.store(0, Ordering::Release) }
    }

    /// # Safety
    /// `hdr` must point to a live header.
    pub unsafe fn touch(hdr: *mut AllocHeader, now: u64) {
        unsafe { (*hdr).last_access.store(now, Ordering::Relaxed) }
    }

    /// # Safety
    /// `hdr` must point to a live header.
    pub unsafe fn request_size(hdr: *const AllocHeader) -> usize {
        unsafe { (*hdr).size }
    }

    /// # Safety
    /// `hdr` must point to a live header.
    pub unsafe fn alloc_time(hdr: *const AllocHeader) -> u64 {
        unsafe { (*hdr).alloc_time }
    }

    /// # Safety
    /// `hdr` must point to a live header.
    pub unsafe fn last_access(hdr: *const AllocHeader) -> u64 {
        unsafe { (*hdr).last_access.load(Ordering::Relaxed) }
    }

    /// # Safety
    /// `hdr` must point to a live header.
    pub unsafe fn site(hdr: *const AllocHeader) -> u16 {
        unsafe { ((*hdr).site_id & 0xffff) as u16 }
    }

    /// # Safety
    /// `hdr` must point to a live header.
    pub unsafe fn thread(hdr: *const AllocHeader) -> u64 {
        unsafe { (*hdr).thread_id }
    }
}
