//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! The host hands Rust a receiver made of two C function pointers plus an
//! opaque `user_data` pointer. `CallbackReceiver` adapts that to the core
//! `Receiver` trait; the strings it passes are owned by Rust and only valid
//! for the duration of the callback.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::sync::Mutex;

use webreq_core::{
    DeliveryContext, DeliveryQueue, Dispatcher, Receiver, ResultEvent, SubmitError,
};

/// Opaque handle owning a dispatcher and the queue its callbacks run from.
pub struct FfiDispatcher {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) context: DeliveryContext,
    pub(crate) queue: Mutex<DeliveryQueue>,
}

impl FfiDispatcher {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        let queue = DeliveryQueue::new("host");
        Self {
            dispatcher,
            context: queue.context(),
            queue: Mutex::new(queue),
        }
    }
}

/// Status returned synchronously by every submit function.
///
/// Anything other than `Ok` means the request was rejected and neither
/// callback will ever fire for it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    Ok = 0,
    NullArg = 1,
    InvalidUtf8 = 2,
    EmptyUrl = 3,
    UnknownMethod = 4,
    BodyNotAllowed = 5,
    Panic = 6,
}

impl From<SubmitError> for FfiStatus {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::EmptyUrl => FfiStatus::EmptyUrl,
            SubmitError::UnknownMethod(_) => FfiStatus::UnknownMethod,
            SubmitError::BodyNotAllowed(_) => FfiStatus::BodyNotAllowed,
        }
    }
}

/// Called when the server answered. Exactly one of `body` and `error_body`
/// is non-null.
pub type FfiResultCallback = extern "C" fn(
    user_data: *mut c_void,
    body: *const c_char,
    status_code: i32,
    status_message: *const c_char,
    error_body: *const c_char,
);

/// Called when the request never completed.
pub type FfiErrorCallback = extern "C" fn(user_data: *mut c_void, message: *const c_char);

/// Receiver supplied by the host. Both callbacks are required.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfiReceiver {
    pub user_data: *mut c_void,
    pub on_result: Option<FfiResultCallback>,
    pub on_error: Option<FfiErrorCallback>,
}

/// Host pointer carried to the delivery thread untouched.
struct UserData(*mut c_void);

// SAFETY: Rust never dereferences the pointer; it is only handed back to the
// host's own callbacks, on the thread that pumps the queue.
unsafe impl Send for UserData {}

pub(crate) struct CallbackReceiver {
    user_data: UserData,
    on_result: FfiResultCallback,
    on_error: FfiErrorCallback,
}

impl CallbackReceiver {
    /// `None` if either callback is missing.
    pub(crate) fn from_ffi(receiver: FfiReceiver) -> Option<Self> {
        Some(Self {
            user_data: UserData(receiver.user_data),
            on_result: receiver.on_result?,
            on_error: receiver.on_error?,
        })
    }
}

impl Receiver for CallbackReceiver {
    fn on_result(self: Box<Self>, event: ResultEvent) {
        let body = event.body.map(to_cstring);
        let status_message = to_cstring(event.status_message);
        let error_body = event.error_body.map(to_cstring);
        (self.on_result)(
            self.user_data.0,
            body.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
            i32::from(event.status_code),
            status_message.as_ptr(),
            error_body.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
        );
    }

    fn on_error(self: Box<Self>, message: String) {
        let message = to_cstring(message);
        (self.on_error)(self.user_data.0, message.as_ptr());
    }
}

/// C strings cannot hold interior NULs; drop them rather than the payload.
pub(crate) fn to_cstring(s: String) -> CString {
    match CString::new(s) {
        Ok(c) => c,
        Err(err) => {
            let mut bytes = err.into_vec();
            bytes.retain(|&b| b != 0);
            CString::new(bytes).unwrap_or_default()
        }
    }
}
