//! Asynchronous web-request bridge for engine hosts.
//!
//! # Overview
//! A caller describes one HTTP call, the `Dispatcher` runs it on a worker
//! through a `Transport`, and the resulting `Outcome` is handed to a
//! `Receiver` exactly once on the `DeliveryContext` the caller chose.
//!
//! # Design
//! - `Transport` is blocking and classifies every result into `Success`,
//!   `Failure` (server answered outside the success policy) or
//!   `TransportError` (call never completed). It never returns `Err`.
//! - `Dispatcher` keeps no per-request state of its own; each job owns its
//!   request, receiver and outcome.
//! - Delivery is either inline on the worker or posted to a `DeliveryQueue`
//!   that the host thread pumps.
//! - Types use owned `String` fields so they map cleanly to the C ABI in
//!   `webreq-ffi`.

pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod outcome;
pub mod transport;

pub use config::{SuccessPolicy, TransportConfig};
pub use delivery::{Delivery, DeliveryContext, DeliveryQueue, FnReceiver, QueueHandle, Receiver};
pub use dispatcher::{Dispatcher, Executor, RequestId, Task, ThreadPerRequest, Ticket};
pub use error::{ConfigError, SubmitError, TransportError, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest};
pub use outcome::{Outcome, ResultEvent};
pub use transport::{Transport, UreqTransport};
