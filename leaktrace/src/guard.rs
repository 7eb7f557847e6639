//! # guard
//! Reentrancy protection for the allocator path. The tracer's own machinery
//! has to allocate now and then - `dlsym` resolution, log formatting, thread
//! spawning - and every one of those allocations arrives back at the
//! interposed entry points. Sections marked internal are served raw: no
//! header, no tracking, no events, so the recursion terminates after a single
//! pass-through call.
//!
//! `free` stays header-aware even inside internal sections, so a tracked
//! block is always released at its base address no matter who frees it.
use core::cell::Cell;

thread_local! {
    static INTERNAL: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside the tracer's own machinery.
///
/// Reports internal when thread-local storage is no longer usable (thread
/// teardown), which keeps late frees on the raw path.
pub fn active() -> bool {
    INTERNAL.try_with(Cell::get).unwrap_or(true)
}

/// Marks the current thread internal for the guard's lifetime. Nests.
pub struct InternalGuard {
    prev: bool,
}

impl InternalGuard {
    pub fn enter() -> Self {
        let prev = INTERNAL.try_with(|flag| flag.replace(true)).unwrap_or(true);
        Self { prev }
    }
}

impl Drop for InternalGuard {
    fn drop(&mut self) {
        let _ = INTERNAL.try_with(|flag| flag.set(self.prev));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting() {
        assert!(!active());
        {
            let _outer = InternalGuard::enter();
            assert!(active());
            {
                let _inner = InternalGuard::enter();
                assert!(active());
            }
            assert!(active());
        }
        assert!(!active());
    }

    #[test]
    fn test_per_thread() {
        let _guard = InternalGuard::enter();
        let other = std::thread::spawn(active).join().unwrap();
        assert!(!other);
    }
}
