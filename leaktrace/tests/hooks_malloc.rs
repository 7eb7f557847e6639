#[cfg(test)]
mod tests {
    use core::ptr::null_mut;

    use leaktrace::{
        HostAddr,
        channel::{EventChannel, EventKind},
        header::AllocHeader,
        hooks::{free::free, malloc::malloc},
        tracer::tracer,
    };

    #[test]
    fn test_zero_size() {
        let ret = unsafe { malloc(0, 0) };
        assert_eq!(ret, null_mut());
    }

    #[test]
    fn test_header_roundtrip() {
        let ptr = unsafe { malloc(1024, 0) };
        assert_ne!(ptr, null_mut());
        assert_eq!(ptr as usize % 16, 0);

        let hdr = unsafe { AllocHeader::from_user(ptr) };
        unsafe {
            assert!(AllocHeader::is_live(hdr));
            assert_eq!(AllocHeader::request_size(hdr), 1024);
            assert!(AllocHeader::alloc_time(hdr) > 0);
            assert_eq!(
                AllocHeader::last_access(hdr),
                AllocHeader::alloc_time(hdr)
            );
            assert_eq!(AllocHeader::thread(hdr), leaktrace::clock::thread_id());
        }
        unsafe { free(ptr) };
    }

    #[test]
    fn test_tracked_until_freed() {
        let ptr = unsafe { malloc(64, 0) };
        assert!(tracer().registry().contains(ptr as HostAddr));
        unsafe { free(ptr) };
        assert!(!tracer().registry().contains(ptr as HostAddr));
    }

    #[test]
    fn test_buffer_writable() {
        let ptr = unsafe { malloc(256, 0) } as *mut u8;
        let buf = unsafe { core::slice::from_raw_parts_mut(ptr, 256) };
        buf.fill(0x5a);
        assert!(buf.iter().all(|b| *b == 0x5a));
        unsafe { free(ptr.cast()) };
    }

    #[test]
    fn test_alloc_event_published() {
        let ptr = unsafe { malloc(4096, 0) };
        let reader = EventChannel::attach(leaktrace::config::get().shm_name()).unwrap();

        let top = reader.write_index();
        let seen = (0..top.min(leaktrace::channel::RING_CAPACITY as u32))
            .filter_map(|seq| reader.read_slot(seq))
            .any(|event| {
                event.event_type == EventKind::Alloc as u32
                    && unsafe { event.payload.alloc }.address == ptr as u64
                    && unsafe { event.payload.alloc }.size == 4096
            });
        assert!(seen);
        unsafe { free(ptr) };
    }
}
