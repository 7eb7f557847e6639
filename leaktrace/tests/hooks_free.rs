#[cfg(test)]
mod tests {
    use core::ptr::null_mut;

    use leaktrace::{
        HostAddr,
        header::AllocHeader,
        hooks::{free::free, malloc::malloc},
        tracer::tracer,
    };

    #[test]
    fn test_null_is_noop() {
        unsafe { free(null_mut()) };
    }

    #[test]
    fn test_untracked_after_free() {
        let ptr = unsafe { malloc(32, 0) };
        let hdr = unsafe { AllocHeader::from_user(ptr) };
        unsafe {
            assert!(AllocHeader::is_live(hdr));
            free(ptr);
        }
        assert!(!tracer().registry().contains(ptr as HostAddr));
    }
}
