//! # hooks
//!
//! This module provides the tracer's replacements for the allocator entry
//! points of the standard C library, plus the access-refresh entry point used
//! by external sampling. The functions here carry the full interposition
//! semantics but deliberately keep their mangled names; `leaktrace_agent`
//! wraps them unmangled so that only the preload object interposes.
//!
//! The site-capturing hooks (`malloc`, `realloc`, `calloc`) take the address
//! of the exported entry point as an extra argument; the frame walk in
//! `site` anchors on that symbol, so the captured call site is the exported
//! symbol's caller no matter which of the intermediate frames the optimizer
//! inlines away.
pub mod access;
pub mod calloc;
pub mod free;
pub mod malloc;
pub mod realloc;
