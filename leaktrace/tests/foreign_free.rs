//! Frees and reallocs of pointers the tracer never produced must pass
//! through untouched: no crash, no events, no counter movement. Runs as a
//! lone test so the counter comparisons are exact.
#[cfg(test)]
mod tests {
    use core::ptr::null_mut;

    use leaktrace::{
        HostAddr,
        hooks::{free::free, malloc::malloc, realloc::realloc},
        tracer::tracer,
    };

    #[test]
    fn test_foreign_pointer_passthrough() {
        // Prime the tracer so later counters move only on tracked activity.
        unsafe { free(malloc(8, 0)) };

        let before = tracer().stats();
        let before_len = tracer().registry().len();

        let foreign = unsafe { libc::malloc(64) };
        assert_ne!(foreign, null_mut());
        assert!(!tracer().registry().contains(foreign as HostAddr));
        unsafe { free(foreign) };

        let foreign2 = unsafe { libc::malloc(32) };
        let grown = unsafe { realloc(foreign2, 96, 0) };
        assert_ne!(grown, null_mut());
        assert!(!tracer().registry().contains(grown as HostAddr));
        unsafe { libc::free(grown) };

        let after = tracer().stats();
        assert_eq!(before, after);
        assert_eq!(tracer().registry().len(), before_len);
    }
}
