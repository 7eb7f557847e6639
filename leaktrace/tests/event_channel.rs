#[cfg(test)]
mod tests {
    use leaktrace::{
        channel::{AllocInfo, EventChannel, EventKind, EventPayload, RING_CAPACITY},
        clock,
    };

    fn publish_n(channel: &EventChannel, n: u32) {
        for i in 0..n {
            channel.publish(
                i + 1,
                EventKind::Alloc,
                clock::now_ns(),
                clock::thread_id(),
                EventPayload {
                    alloc: AllocInfo::new(0x1000 + i as usize, 64, clock::now_ns(), 7),
                },
            );
        }
    }

    #[test]
    fn test_publish_and_read_back() {
        let channel = EventChannel::create(c"/leaktrace_test_ring_basic").unwrap();
        assert_eq!(channel.write_index(), 0);
        assert!(channel.read_slot(0).is_none());

        publish_n(&channel, 10);
        assert_eq!(channel.write_index(), 10);
        for seq in 0..10 {
            let event = channel.read_slot(seq).unwrap();
            assert_eq!(event.event_id, seq + 1);
            assert_eq!(event.event_type, EventKind::Alloc as u32);
            assert_eq!(event.thread_id, clock::thread_id());
            let info = unsafe { event.payload.alloc };
            assert_eq!(info.address, 0x1000 + seq as u64);
            assert_eq!(info.size, 64);
            assert_eq!(info.site_id, 7);
        }
    }

    #[test]
    fn test_every_published_slot_is_valid() {
        let channel = EventChannel::create(c"/leaktrace_test_ring_valid").unwrap();
        publish_n(&channel, 123);
        for seq in 0..channel.write_index() {
            assert!(channel.read_slot(seq).is_some());
        }
    }

    #[test]
    fn test_wraparound_overwrites_oldest() {
        let channel = EventChannel::create(c"/leaktrace_test_ring_wrap").unwrap();
        let n = RING_CAPACITY as u32 + 5;
        publish_n(&channel, n);
        assert_eq!(channel.write_index(), n);

        // Slot 0 now carries the first second-lap record.
        let event = channel.read_slot(0).unwrap();
        assert_eq!(event.event_id, RING_CAPACITY as u32 + 1);
        // The newest record landed in slot 4.
        let event = channel.read_slot(n - 1).unwrap();
        assert_eq!(event.event_id, n);
        // Slot 5 still carries its first-lap record.
        let event = channel.read_slot(5).unwrap();
        assert_eq!(event.event_id, 6);
    }

    #[test]
    fn test_counters() {
        let channel = EventChannel::create(c"/leaktrace_test_ring_counters").unwrap();
        channel.count_alloc(100);
        channel.count_alloc(50);
        channel.count_free(100);
        channel.count_leak();
        assert_eq!(channel.total_allocations(), 2);
        assert_eq!(channel.total_frees(), 1);
        assert_eq!(channel.current_memory(), 50);
        assert_eq!(channel.leak_count(), 1);
    }

    #[test]
    fn test_reader_attaches_by_name() {
        let producer = EventChannel::create(c"/leaktrace_test_ring_attach").unwrap();
        publish_n(&producer, 3);
        producer.count_alloc(42);

        let reader = EventChannel::attach(c"/leaktrace_test_ring_attach").unwrap();
        assert_eq!(reader.write_index(), 3);
        assert_eq!(reader.total_allocations(), 1);
        assert_eq!(reader.current_memory(), 42);
        let event = reader.read_slot(2).unwrap();
        assert_eq!(event.event_id, 3);
    }
}
