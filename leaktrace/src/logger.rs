//! # logger
//! A `log` backend which writes straight to standard error through a
//! `Symbols`-resolved `write`. Formatting allocates, so the whole emission
//! runs inside an internal guard section; those allocations pass through the
//! interposed entry points untracked and the logging path cannot recurse
//! into its own bookkeeping.
use core::ffi::{CStr, c_int, c_void};

use libc::{STDERR_FILENO, size_t, ssize_t};
use log::{Level, Log, Metadata, Record};
use spin::Once;

use crate::{
    HostAddr,
    guard::InternalGuard,
    symbols::{
        Function, FunctionPointer, Symbols,
        dlsym::{DlSymSymbols, LookupTypeNext},
    },
};

#[derive(Debug)]
struct FunctionWrite;

impl Function for FunctionWrite {
    type Func = unsafe extern "C" fn(c_int, *const c_void, size_t) -> ssize_t;
    const NAME: &'static CStr = c"write";
}

static ONCE: Once<&'static StderrLogger> = Once::new();

pub struct StderrLogger {
    level: Level,
    write: HostAddr,
}

impl StderrLogger {
    /// Installs the logger. Idempotent; later calls keep the first level.
    pub fn initialize(level: Level) {
        ONCE.call_once(|| {
            let _internal = InternalGuard::enter();
            let write = DlSymSymbols::<LookupTypeNext>::lookup(FunctionWrite::NAME).unwrap();
            let logger: &'static StderrLogger = Box::leak(Box::new(StderrLogger { level, write }));
            log::set_logger(logger).unwrap();
            log::set_max_level(level.to_level_filter());
            logger
        });
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.level >= metadata.level()
    }

    fn flush(&self) {}

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _internal = InternalGuard::enter();
            let formatted = format!(
                "leaktrace {} [{}]: {}\n",
                record.metadata().level(),
                record.metadata().target(),
                record.args()
            );
            let buf = formatted.as_bytes();
            let fn_write = FunctionWrite::as_ptr(self.write).unwrap();
            unsafe {
                let _ = fn_write(STDERR_FILENO, buf.as_ptr() as *const c_void, buf.len() as size_t);
            }
        }
    }
}
