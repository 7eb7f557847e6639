//! # symbols
//! Typed symbol lookup. The tracer reaches the functions it interposes (and a
//! couple it merely borrows, like `write`) through the [`Symbols`] trait so
//! the lookup mechanism can be substituted on targets where `dlsym` is not
//! available. Each resolved address is cached in an [`AtomicAddr`], so the
//! hot path pays one atomic load after the first call.
use core::{
    ffi::CStr,
    fmt::Debug,
    sync::atomic::{AtomicUsize, Ordering},
};

use thiserror::Error;

use crate::HostAddr;

pub mod dlsym;

pub trait Symbols: Debug + Sized + Send {
    type Error: Debug;
    fn lookup(name: &'static CStr) -> Result<HostAddr, Self::Error>;
}

/// A named C function together with its pointer type.
pub trait Function {
    const NAME: &'static CStr;
    type Func: Copy;
}

pub trait FunctionPointer: Function {
    fn as_ptr(addr: HostAddr) -> Result<Self::Func, FunctionPointerError>;
}

impl<T: Function> FunctionPointer for T {
    fn as_ptr(addr: HostAddr) -> Result<Self::Func, FunctionPointerError> {
        if addr == HostAddr::MIN || addr == HostAddr::MAX {
            Err(FunctionPointerError::BadAddress(addr))?;
        }
        let pp_sym = (&addr) as *const HostAddr as *const Self::Func;
        let f = unsafe { *pp_sym };
        Ok(f)
    }
}

#[derive(Error, Debug, PartialEq, Clone)]
pub enum FunctionPointerError {
    #[error("Bad address: {0:#x}")]
    BadAddress(HostAddr),
}

/// Once-written cache of a resolved symbol address. Zero means unresolved;
/// racing resolvers store the same value, so the last write is as good as the
/// first.
pub struct AtomicAddr(AtomicUsize);

impl AtomicAddr {
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    pub fn get(&self) -> Option<HostAddr> {
        match self.0.load(Ordering::Acquire) {
            0 => None,
            addr => Some(addr),
        }
    }

    pub fn try_get_or_insert_with<E>(
        &self,
        f: impl FnOnce() -> Result<HostAddr, E>,
    ) -> Result<HostAddr, E> {
        match self.get() {
            Some(addr) => Ok(addr),
            None => {
                let addr = f()?;
                self.0.store(addr, Ordering::Release);
                Ok(addr)
            }
        }
    }
}

impl Default for AtomicAddr {
    fn default() -> Self {
        Self::new()
    }
}
