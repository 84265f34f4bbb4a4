//! Stack growth for deep graph recursion.
//!
//! Every reference the engine descends into costs a few native frames, so
//! a long acyclic chain (a linked list with 100k nodes) would overflow a
//! default thread stack. On native targets recursion runs under
//! `stacker`, which switches to a fresh segment when the remaining stack
//! drops below the red zone. Growth can be turned off through
//! [`CloneConfig::grow_stack`](crate::CloneConfig::grow_stack).
//!
//! WASM manages its own stack; there the wrapper is a passthrough.

/// Minimum stack space to keep available (100KB red zone).
#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
#[cfg(not(target_arch = "wasm32"))]
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, growing the stack first if it is close to exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    if crate::config::active().grows_stack() {
        stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
    } else {
        f()
    }
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
