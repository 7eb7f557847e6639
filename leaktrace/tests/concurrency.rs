//! Conservation under parallel churn: eight threads allocating and freeing
//! through the hooks while the counters, registry and event ring stay
//! self-consistent. Runs as a lone test so the totals are exact.
#[cfg(test)]
mod tests {
    use std::thread;

    use leaktrace::{
        HostAddr,
        channel::{EventChannel, EventKind, RING_CAPACITY},
        config,
        hooks::{free::free, malloc::malloc},
        tracer::tracer,
    };

    const THREADS: usize = 8;
    const PER_THREAD: usize = 1000;
    const KEPT: usize = 50;

    #[test]
    fn test_parallel_conservation() {
        let workers: Vec<_> = (0..THREADS)
            .map(|t| {
                thread::spawn(move || {
                    let mut live: Vec<(usize, usize)> = Vec::new();
                    for i in 0..PER_THREAD {
                        let size = 16 + ((t * PER_THREAD + i) % 512);
                        let ptr = unsafe { malloc(size, 0) };
                        assert!(!ptr.is_null());
                        live.push((ptr as usize, size));
                        // Free early blocks as we go, keep the tail live.
                        if live.len() > KEPT {
                            let (victim, _) = live.remove(0);
                            unsafe { free(victim as *mut _) };
                        }
                    }
                    live
                })
            })
            .collect();

        let live: Vec<(usize, usize)> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();

        let (allocs, frees, current) = tracer().stats();
        assert_eq!(allocs, (THREADS * PER_THREAD) as u64);
        assert_eq!(frees, (THREADS * (PER_THREAD - KEPT)) as u64);
        assert_eq!(allocs - frees, tracer().registry().len() as u64);
        let live_bytes: u64 = live.iter().map(|(_, size)| *size as u64).sum();
        assert_eq!(current, live_bytes);
        for (ptr, _) in &live {
            assert!(tracer().registry().contains(*ptr as HostAddr));
        }

        // No torn records: every readable slot is fully published and
        // self-consistent.
        let reader = EventChannel::attach(config::get().shm_name()).unwrap();
        let top = reader.write_index();
        assert_eq!(top as u64, allocs + frees);
        let readable = (top as usize).min(RING_CAPACITY) as u32;
        for seq in (top - readable)..top {
            let event = reader.read_slot(seq).expect("published slot must be valid");
            let kind = EventKind::from_u32(event.event_type).expect("known event type");
            assert!(matches!(kind, EventKind::Alloc | EventKind::Free));
            assert_ne!(event.event_id, 0);
            assert_ne!(event.timestamp, 0);
            let info = unsafe { event.payload.alloc };
            assert_ne!(info.address, 0);
            assert!(info.size >= 16 && info.size < 16 + 512);
        }

        for (ptr, _) in live {
            unsafe { free(ptr as *mut _) };
        }
        let (allocs, frees, current) = tracer().stats();
        assert_eq!(allocs, frees);
        assert_eq!(current, 0);
        assert_eq!(tracer().registry().len(), 0);
    }
}
