//! # dlsym
//! [`Symbols`] implemented with `libc::dlsym`. [`LookupTypeNext`] resolves
//! with `RTLD_NEXT` and is the one the tracer wants: it skips the agent
//! library itself and lands on the allocator the process would have used
//! without interposition.
//!
//! `dlsym` allocates internally, so the lookup runs inside an internal guard
//! section; those allocations are served by the bootstrap arena until the
//! real allocator is cached.
use core::{
    ffi::{CStr, c_void},
    fmt::Debug,
    marker::PhantomData,
};

use thiserror::Error;

use crate::{HostAddr, guard::InternalGuard, symbols::Symbols};

pub trait LookupType: Debug + Send {
    fn handle() -> *mut c_void;
}

/// `RTLD_NEXT`: the next occurrence of the symbol after the calling object.
#[derive(Debug, Copy, Clone)]
pub struct LookupTypeNext;

impl LookupType for LookupTypeNext {
    fn handle() -> *mut c_void {
        libc::RTLD_NEXT
    }
}

/// `RTLD_DEFAULT`: the first occurrence in the global search order.
#[derive(Debug, Copy, Clone)]
pub struct LookupTypeDefault;

impl LookupType for LookupTypeDefault {
    fn handle() -> *mut c_void {
        libc::RTLD_DEFAULT
    }
}

#[derive(Debug)]
pub struct DlSymSymbols<L: LookupType> {
    _phantom: PhantomData<L>,
}

impl<L: LookupType> Symbols for DlSymSymbols<L> {
    type Error = DlSymSymbolsError;

    fn lookup(name: &'static CStr) -> Result<HostAddr, Self::Error> {
        let _internal = InternalGuard::enter();
        let addr = unsafe { libc::dlsym(L::handle(), name.as_ptr()) };
        if addr.is_null() {
            Err(DlSymSymbolsError::SymbolNotFound(name))?;
        }
        Ok(addr as HostAddr)
    }
}

#[derive(Error, Debug, PartialEq, Clone)]
pub enum DlSymSymbolsError {
    #[error("Symbol not found: {0:?}")]
    SymbolNotFound(&'static CStr),
}
