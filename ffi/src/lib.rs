//! C-ABI wrapper around `webreq-core`.
//!
//! # Overview
//! Lets an engine host (or any language with a C FFI) fire HTTP requests
//! without blocking its main thread. Requests run on Rust worker threads;
//! their callbacks run on the host thread when it calls
//! `webreq_dispatcher_pump`, typically once per frame.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Submit functions return an `FfiStatus` synchronously. `Ok` guarantees
//!   exactly one callback later, unless the dispatcher is freed first; any
//!   other status guarantees none.
//! - Strings passed to callbacks are borrowed for the call only; the host
//!   copies what it wants to keep. Absent values are null.
//! - The host owns the `FfiDispatcher` and must release it with
//!   `webreq_dispatcher_free`. Deliveries still queued at that point, and
//!   requests still in flight, are dropped without running their callbacks;
//!   the host must reclaim any `user_data` it handed to them.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;

use tracing::warn;
use webreq_core::{Dispatcher, HttpRequest, TransportConfig};

use types::*;

// ---------------------------------------------------------------------------
// Dispatcher lifecycle
// ---------------------------------------------------------------------------

/// Create a dispatcher.
///
/// `config_json` may be null for defaults, otherwise a JSON object such as
/// `{"success":{"only":[200,201]},"timeout_ms":5000}`. Returns null if the
/// JSON is invalid. Free with `webreq_dispatcher_free`.
#[unsafe(no_mangle)]
pub extern "C" fn webreq_dispatcher_new(config_json: *const c_char) -> *mut FfiDispatcher {
    catch_unwind(|| {
        let config = if config_json.is_null() {
            TransportConfig::default()
        } else {
            let Some(json) = borrow_str(config_json) else {
                return std::ptr::null_mut();
            };
            match TransportConfig::from_json(json) {
                Ok(config) => config,
                Err(err) => {
                    warn!(error = %err, "rejecting dispatcher config");
                    return std::ptr::null_mut();
                }
            }
        };
        let dispatcher = FfiDispatcher::new(Dispatcher::new(&config));
        Box::into_raw(Box::new(dispatcher))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a dispatcher created by `webreq_dispatcher_new`. Safe to call with
/// null. Workers still running finish their call and discard the outcome.
#[unsafe(no_mangle)]
pub extern "C" fn webreq_dispatcher_free(dispatcher: *mut FfiDispatcher) {
    if !dispatcher.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(dispatcher) });
        }));
    }
}

/// Run every queued callback on the calling thread and return how many ran.
///
/// Returns 0 for a null dispatcher, or when called re-entrantly from inside
/// a callback.
#[unsafe(no_mangle)]
pub extern "C" fn webreq_dispatcher_pump(dispatcher: *const FfiDispatcher) -> u32 {
    if dispatcher.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let dispatcher = unsafe { &*dispatcher };
        match dispatcher.queue.try_lock() {
            Ok(queue) => u32::try_from(queue.pump()).unwrap_or(u32::MAX),
            Err(_) => 0,
        }
    }))
    .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Submit functions
// ---------------------------------------------------------------------------

/// Submit a request. `method` is a verb such as `"GET"` (case-insensitive);
/// `body` may be null and is only allowed for POST, PUT and PATCH.
#[unsafe(no_mangle)]
pub extern "C" fn webreq_submit(
    dispatcher: *const FfiDispatcher,
    url: *const c_char,
    method: *const c_char,
    body: *const c_char,
    receiver: FfiReceiver,
) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| {
        if method.is_null() {
            return FfiStatus::NullArg;
        }
        let Some(method) = borrow_str(method) else {
            return FfiStatus::InvalidUtf8;
        };
        submit(dispatcher, url, method, body, receiver)
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Submit a GET request.
#[unsafe(no_mangle)]
pub extern "C" fn webreq_get(
    dispatcher: *const FfiDispatcher,
    url: *const c_char,
    receiver: FfiReceiver,
) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| {
        submit(dispatcher, url, "GET", std::ptr::null(), receiver)
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Submit a POST request with a JSON body. `body` may be null.
#[unsafe(no_mangle)]
pub extern "C" fn webreq_post(
    dispatcher: *const FfiDispatcher,
    url: *const c_char,
    body: *const c_char,
    receiver: FfiReceiver,
) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| submit(dispatcher, url, "POST", body, receiver)))
        .unwrap_or(FfiStatus::Panic)
}

/// Submit a PUT request with a JSON body. `body` may be null.
#[unsafe(no_mangle)]
pub extern "C" fn webreq_put(
    dispatcher: *const FfiDispatcher,
    url: *const c_char,
    body: *const c_char,
    receiver: FfiReceiver,
) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| submit(dispatcher, url, "PUT", body, receiver)))
        .unwrap_or(FfiStatus::Panic)
}

/// Install a stderr `tracing` subscriber at `level` (`"info"` when null).
/// Returns false if the level is unknown or a subscriber already exists.
#[unsafe(no_mangle)]
pub extern "C" fn webreq_init_logging(level: *const c_char) -> bool {
    catch_unwind(|| {
        let level = if level.is_null() {
            tracing::Level::INFO
        } else {
            match borrow_str(level).map(tracing::Level::from_str) {
                Some(Ok(level)) => level,
                _ => return false,
            }
        };
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Shared validation for every submit entry point. Nothing is scheduled
/// unless every argument checks out.
fn submit(
    dispatcher: *const FfiDispatcher,
    url: *const c_char,
    method: &str,
    body: *const c_char,
    receiver: FfiReceiver,
) -> FfiStatus {
    if dispatcher.is_null() || url.is_null() {
        return FfiStatus::NullArg;
    }
    let Some(receiver) = CallbackReceiver::from_ffi(receiver) else {
        return FfiStatus::NullArg;
    };
    let Some(url) = borrow_str(url) else {
        return FfiStatus::InvalidUtf8;
    };
    let body = if body.is_null() {
        None
    } else {
        match borrow_str(body) {
            Some(body) => Some(body),
            None => return FfiStatus::InvalidUtf8,
        }
    };
    let request = match HttpRequest::parse(url, method, body) {
        Ok(request) => request,
        Err(err) => return err.into(),
    };

    let dispatcher = unsafe { &*dispatcher };
    dispatcher
        .dispatcher
        .submit(request, receiver, &dispatcher.context);
    FfiStatus::Ok
}

/// Borrow a non-null C string as UTF-8.
fn borrow_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
