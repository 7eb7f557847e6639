//! # real
//! Pass-through access to the allocator the tracer interposes. Each entry
//! point is resolved once through `dlsym(RTLD_NEXT, ..)` and cached. An
//! unresolvable allocator aborts the process: the tracer can neither serve
//! nor forward the request at that point.
use core::ffi::{CStr, c_void};

use libc::size_t;

use crate::symbols::{
    AtomicAddr, Function, FunctionPointer, Symbols,
    dlsym::{DlSymSymbols, LookupTypeNext},
};

type Syms = DlSymSymbols<LookupTypeNext>;

pub type MallocFn = unsafe extern "C" fn(size_t) -> *mut c_void;
pub type FreeFn = unsafe extern "C" fn(*mut c_void);
pub type ReallocFn = unsafe extern "C" fn(*mut c_void, size_t) -> *mut c_void;
pub type CallocFn = unsafe extern "C" fn(size_t, size_t) -> *mut c_void;

#[derive(Debug)]
struct FunctionMalloc;

impl Function for FunctionMalloc {
    type Func = MallocFn;
    const NAME: &'static CStr = c"malloc";
}

#[derive(Debug)]
struct FunctionFree;

impl Function for FunctionFree {
    type Func = FreeFn;
    const NAME: &'static CStr = c"free";
}

#[derive(Debug)]
struct FunctionRealloc;

impl Function for FunctionRealloc {
    type Func = ReallocFn;
    const NAME: &'static CStr = c"realloc";
}

#[derive(Debug)]
struct FunctionCalloc;

impl Function for FunctionCalloc {
    type Func = CallocFn;
    const NAME: &'static CStr = c"calloc";
}

static MALLOC_ADDR: AtomicAddr = AtomicAddr::new();
static FREE_ADDR: AtomicAddr = AtomicAddr::new();
static REALLOC_ADDR: AtomicAddr = AtomicAddr::new();
static CALLOC_ADDR: AtomicAddr = AtomicAddr::new();

fn die(name: &CStr) -> ! {
    // The logger needs symbol resolution too, so this writes raw.
    const PREFIX: &[u8] = b"leaktrace: failed to resolve allocator symbol ";
    unsafe {
        let _ = libc::write(libc::STDERR_FILENO, PREFIX.as_ptr().cast(), PREFIX.len());
        let _ = libc::write(
            libc::STDERR_FILENO,
            name.as_ptr().cast(),
            name.to_bytes().len(),
        );
        let _ = libc::write(libc::STDERR_FILENO, b"\n".as_ptr().cast(), 1);
        libc::abort()
    }
}

fn resolve<F: FunctionPointer>(cache: &AtomicAddr) -> F::Func {
    let addr = match cache.try_get_or_insert_with(|| Syms::lookup(F::NAME)) {
        Ok(addr) => addr,
        Err(_) => die(F::NAME),
    };
    match F::as_ptr(addr) {
        Ok(f) => f,
        Err(_) => die(F::NAME),
    }
}

fn cached<F: FunctionPointer>(cache: &AtomicAddr) -> Option<F::Func> {
    cache.get().and_then(|addr| F::as_ptr(addr).ok())
}

/// Primes all four caches. Called once at startup so later failures cannot
/// surface mid-run.
pub fn resolve_all() {
    let _ = resolve::<FunctionMalloc>(&MALLOC_ADDR);
    let _ = resolve::<FunctionFree>(&FREE_ADDR);
    let _ = resolve::<FunctionRealloc>(&REALLOC_ADDR);
    let _ = resolve::<FunctionCalloc>(&CALLOC_ADDR);
}

/// The real `malloc` when already resolved. Used on guarded paths which must
/// not trigger resolution.
pub fn cached_malloc() -> Option<MallocFn> {
    cached::<FunctionMalloc>(&MALLOC_ADDR)
}

/// # Safety
/// See man pages.
pub unsafe fn malloc(size: size_t) -> *mut c_void {
    let fn_malloc = resolve::<FunctionMalloc>(&MALLOC_ADDR);
    unsafe { fn_malloc(size) }
}

/// # Safety
/// See man pages.
pub unsafe fn free(ptr: *mut c_void) {
    let fn_free = resolve::<FunctionFree>(&FREE_ADDR);
    unsafe { fn_free(ptr) }
}

/// # Safety
/// See man pages.
pub unsafe fn realloc(ptr: *mut c_void, size: size_t) -> *mut c_void {
    let fn_realloc = resolve::<FunctionRealloc>(&REALLOC_ADDR);
    unsafe { fn_realloc(ptr, size) }
}

/// # Safety
/// See man pages.
pub unsafe fn calloc(nmemb: size_t, size: size_t) -> *mut c_void {
    let fn_calloc = resolve::<FunctionCalloc>(&CALLOC_ADDR);
    unsafe { fn_calloc(nmemb, size) }
}
