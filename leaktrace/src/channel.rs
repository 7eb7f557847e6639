//! # channel
//! The event channel: a fixed-capacity ring of 64-byte event records in named
//! shared memory, single process of producers, any number of out-of-process
//! readers. Producers claim a slot with a fetch-and-add on `write_index`,
//! write the record, then release-store the slot's `is_valid` word; a reader
//! must treat `is_valid == 1` (acquire) as the completion gate for a slot.
//! The tracer never consults `read_index` and never blocks: a reader which
//! falls more than [`RING_CAPACITY`] behind loses events.
//!
//! Layout of the mapped region (all integers native-endian, offsets fixed):
//!
//! ```plaintext
//! 0x00 write_index: u32        0x04 read_index: u32
//! 0x08 total_allocations: u64  0x10 total_frees: u64
//! 0x18 current_memory: u64     0x20 leak_count: u32
//! 0x24 reserved: u32           0x28 events[1000]: 64 bytes each
//! ```
use core::{
    ffi::CStr,
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
};

use crate::{
    HostAddr,
    shm::{ShMem, ShMemError},
};

/// Number of event slots in the ring.
pub const RING_CAPACITY: usize = 1000;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Alloc = 1,
    Free = 2,
    Leak = 3,
    /// Reserved for external access samplers; the tracer itself only folds
    /// accesses into header timestamps.
    Access = 4,
}

impl EventKind {
    pub fn from_u32(raw: u32) -> Option<EventKind> {
        match raw {
            1 => Some(EventKind::Alloc),
            2 => Some(EventKind::Free),
            3 => Some(EventKind::Leak),
            4 => Some(EventKind::Access),
            _ => None,
        }
    }
}

/// Allocation details carried by `Alloc` and `Free` events.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AllocInfo {
    pub address: u64,
    pub size: u64,
    pub alloc_time: u64,
    pub site_id: u32,
    _pad: u32,
}

impl AllocInfo {
    pub fn new(address: HostAddr, size: usize, alloc_time: u64, site: u16) -> Self {
        Self {
            address: address as u64,
            size: size as u64,
            alloc_time,
            site_id: site as u32,
            _pad: 0,
        }
    }
}

/// Leak details carried by `Leak` events.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LeakInfo {
    pub address: u64,
    pub size: u64,
    pub staleness_ns: u64,
    pub site_id: u32,
    _pad: u32,
}

impl LeakInfo {
    pub fn new(address: HostAddr, size: usize, staleness_ns: u64, site: u16) -> Self {
        Self {
            address: address as u64,
            size: size as u64,
            staleness_ns,
            site_id: site as u32,
            _pad: 0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union EventPayload {
    pub alloc: AllocInfo,
    pub leak: LeakInfo,
}

#[repr(C)]
pub struct EventRecord {
    event_id: u32,
    event_type: u32,
    timestamp: u64,
    thread_id: u64,
    payload: EventPayload,
    /// Publication gate: 1 once every other field of this lap is written.
    is_valid: AtomicU32,
    _reserved: u32,
}

const _: () = assert!(size_of::<EventRecord>() == 64);

/// The shared region: counters up front, event slots behind.
#[repr(C)]
pub struct RingBuffer {
    pub write_index: AtomicU32,
    /// Reader-owned; the tracer never reads or writes it.
    pub read_index: AtomicU32,
    pub total_allocations: AtomicU64,
    pub total_frees: AtomicU64,
    pub current_memory: AtomicU64,
    pub leak_count: AtomicU32,
    _reserved: u32,
    pub events: [EventRecord; RING_CAPACITY],
}

/// Bytes of shared memory backing one channel.
pub const SHM_SIZE: usize = size_of::<RingBuffer>();

/// Owned copy of one published event, safe to hold after the slot is reused.
#[derive(Clone, Copy)]
pub struct EventSnapshot {
    pub event_id: u32,
    pub event_type: u32,
    pub timestamp: u64,
    pub thread_id: u64,
    pub payload: EventPayload,
}

pub struct EventChannel {
    shm: ShMem,
    ring: *mut RingBuffer,
}

// Producers share &self across threads; every mutation below is atomic or
// confined to a slot the producer just claimed.
unsafe impl Send for EventChannel {}
unsafe impl Sync for EventChannel {}

impl EventChannel {
    /// Creates the shared object and zeroes indices, counters and slots.
    pub fn create(name: &CStr) -> Result<EventChannel, ShMemError> {
        let shm = ShMem::create(name, SHM_SIZE)?;
        let ring = shm.as_ptr() as *mut RingBuffer;
        Ok(EventChannel { shm, ring })
    }

    /// Attaches to a channel created elsewhere, e.g. from a reader.
    pub fn attach(name: &CStr) -> Result<EventChannel, ShMemError> {
        let shm = ShMem::attach(name, SHM_SIZE)?;
        let ring = shm.as_ptr() as *mut RingBuffer;
        Ok(EventChannel { shm, ring })
    }

    fn header(&self) -> &RingBuffer {
        unsafe { &*self.ring }
    }

    pub fn name(&self) -> &CStr {
        self.shm.name()
    }

    /// Publishes one event. Lock-free; safe against concurrent producers.
    pub fn publish(
        &self,
        event_id: u32,
        kind: EventKind,
        timestamp: u64,
        thread_id: u64,
        payload: EventPayload,
    ) {
        let seq = self.header().write_index.fetch_add(1, Ordering::Relaxed);
        let index = seq as usize % RING_CAPACITY;
        let slot = unsafe { (&raw mut (*self.ring).events).cast::<EventRecord>().add(index) };
        unsafe {
            // Take the slot off the readable set before touching its body.
            (*slot).is_valid.store(0, Ordering::Release);
            (*slot).event_id = event_id;
            (*slot).event_type = kind as u32;
            (*slot).timestamp = timestamp;
            (*slot).thread_id = thread_id;
            (*slot).payload = payload;
            (*slot).is_valid.store(1, Ordering::Release);
        }
    }

    /// Copies slot `seq mod N` if it carries a published record.
    pub fn read_slot(&self, seq: u32) -> Option<EventSnapshot> {
        let index = seq as usize % RING_CAPACITY;
        let slot = unsafe {
            (&raw const (*self.ring).events)
                .cast::<EventRecord>()
                .add(index)
        };
        unsafe {
            if (*slot).is_valid.load(Ordering::Acquire) != 1 {
                return None;
            }
            Some(EventSnapshot {
                event_id: (*slot).event_id,
                event_type: (*slot).event_type,
                timestamp: (*slot).timestamp,
                thread_id: (*slot).thread_id,
                payload: (*slot).payload,
            })
        }
    }

    pub fn write_index(&self) -> u32 {
        self.header().write_index.load(Ordering::Acquire)
    }

    pub fn count_alloc(&self, size: usize) {
        let header = self.header();
        header.total_allocations.fetch_add(1, Ordering::Relaxed);
        header.current_memory.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn count_free(&self, size: usize) {
        let header = self.header();
        header.total_frees.fetch_add(1, Ordering::Relaxed);
        header.current_memory.fetch_sub(size as u64, Ordering::Relaxed);
    }

    pub fn count_leak(&self) {
        self.header().leak_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_allocations(&self) -> u64 {
        self.header().total_allocations.load(Ordering::Relaxed)
    }

    pub fn total_frees(&self) -> u64 {
        self.header().total_frees.load(Ordering::Relaxed)
    }

    pub fn current_memory(&self) -> u64 {
        self.header().current_memory.load(Ordering::Relaxed)
    }

    pub fn leak_count(&self) -> u32 {
        self.header().leak_count.load(Ordering::Relaxed)
    }
}
