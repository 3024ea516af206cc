//! Runs transports off the caller's thread and delivers each outcome once.
//!
//! # Design
//! `submit` never touches the network: it validates, captures the caller's
//! `DeliveryContext`, and hands a job to an `Executor`. The job owns its
//! request, its receiver and, once the transport returns, its outcome;
//! nothing about a request outlives that job or is visible to another one.
//!
//! The job sits in a one-shot slot shared between the worker and `submit`.
//! Whoever takes it delivers it, so a worker that never starts still ends in
//! exactly one `on_error` rather than a lost request.

use std::fmt;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TransportConfig;
use crate::delivery::{Delivery, DeliveryContext, Receiver};
use crate::error::{SubmitError, TransportError, TransportErrorKind};
use crate::http::HttpRequest;
use crate::outcome::Outcome;
use crate::transport::{Transport, UreqTransport};

/// Correlates log lines and tickets with one submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unit of work handed to an `Executor`.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Starts workers.
pub trait Executor: Send + Sync + 'static {
    /// Run `task` somewhere other than the calling thread. An `Err` means
    /// the task was dropped without running.
    fn spawn(&self, task: Task) -> io::Result<()>;
}

/// One named OS thread per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPerRequest;

impl Executor for ThreadPerRequest {
    fn spawn(&self, task: Task) -> io::Result<()> {
        thread::Builder::new()
            .name("webreq-worker".to_string())
            .spawn(task)
            .map(drop)
    }
}

/// Handle to a submitted request.
#[derive(Debug, Clone)]
pub struct Ticket {
    id: RequestId,
    cancelled: Arc<AtomicBool>,
}

impl Ticket {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Ask for the request to be delivered as cancelled.
    ///
    /// Checked before the call starts and again before delivery; a call
    /// already on the wire runs to completion but its outcome is replaced.
    /// Has no effect once the delivery has been posted.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct Job {
    id: RequestId,
    request: HttpRequest,
    receiver: Box<dyn Receiver>,
    context: DeliveryContext,
    cancelled: Arc<AtomicBool>,
}

impl Job {
    fn run<T: Transport>(self, transport: &T) {
        let outcome = if self.cancelled.load(Ordering::SeqCst) {
            TransportError::cancelled().into()
        } else {
            execute_contained(transport, &self.request)
        };
        let outcome = if self.cancelled.load(Ordering::SeqCst) {
            TransportError::cancelled().into()
        } else {
            outcome
        };
        self.deliver(outcome);
    }

    fn deliver(self, outcome: Outcome) {
        match &outcome {
            Outcome::Success { status_code, .. } | Outcome::Failure { status_code, .. } => {
                info!(
                    request_id = %self.id,
                    status = *status_code,
                    success = outcome.is_success(),
                    "request completed"
                );
            }
            Outcome::TransportError(err) => {
                warn!(
                    request_id = %self.id,
                    kind = %err.kind,
                    error = %err.message,
                    "request failed"
                );
            }
        }
        self.context
            .post(Delivery::new(self.id, outcome, self.receiver));
    }
}

/// A transport that panics still yields an outcome.
fn execute_contained<T: Transport>(transport: &T, request: &HttpRequest) -> Outcome {
    catch_unwind(AssertUnwindSafe(|| transport.execute(request))).unwrap_or_else(|_| {
        TransportError::new(TransportErrorKind::Io, "transport panicked").into()
    })
}

fn take(slot: &Mutex<Option<Job>>) -> Option<Job> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Fire-and-forget request execution with single delivery.
pub struct Dispatcher<T: Transport = UreqTransport> {
    transport: Arc<T>,
    executor: Arc<dyn Executor>,
}

impl<T: Transport> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            executor: Arc::clone(&self.executor),
        }
    }
}

impl Dispatcher<UreqTransport> {
    pub fn new(config: &TransportConfig) -> Self {
        Self::with_transport(UreqTransport::new(config))
    }
}

impl Default for Dispatcher<UreqTransport> {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            executor: Arc::new(ThreadPerRequest),
        }
    }

    pub fn with_executor(mut self, executor: impl Executor) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    /// Execute `request` on a worker and deliver its outcome to `receiver`
    /// through `context`. Returns without waiting for the network.
    pub fn submit(
        &self,
        request: HttpRequest,
        receiver: impl Receiver,
        context: &DeliveryContext,
    ) -> Ticket {
        let id = RequestId::new();
        let cancelled = Arc::new(AtomicBool::new(false));
        debug!(
            request_id = %id,
            method = %request.method(),
            url = request.url(),
            "request submitted"
        );

        let slot = Arc::new(Mutex::new(Some(Job {
            id,
            request,
            receiver: Box::new(receiver),
            context: context.clone(),
            cancelled: Arc::clone(&cancelled),
        })));

        let worker_slot = Arc::clone(&slot);
        let transport = Arc::clone(&self.transport);
        let spawned = self.executor.spawn(Box::new(move || {
            if let Some(job) = take(&worker_slot) {
                job.run(&*transport);
            }
        }));

        if let Err(err) = spawned {
            warn!(request_id = %id, error = %err, "could not start worker");
            if let Some(job) = take(&slot) {
                job.deliver(
                    TransportError::new(
                        TransportErrorKind::WorkerUnavailable,
                        format!("could not start worker: {err}"),
                    )
                    .into(),
                );
            }
        }

        Ticket { id, cancelled }
    }

    /// String-typed `submit`. Programming errors are returned here and no
    /// callback ever fires for them.
    pub fn submit_raw(
        &self,
        url: &str,
        method: &str,
        body: Option<&str>,
        receiver: impl Receiver,
        context: &DeliveryContext,
    ) -> Result<Ticket, SubmitError> {
        let request = HttpRequest::parse(url, method, body)?;
        Ok(self.submit(request, receiver, context))
    }

    pub fn get(
        &self,
        url: &str,
        receiver: impl Receiver,
        context: &DeliveryContext,
    ) -> Result<Ticket, SubmitError> {
        Ok(self.submit(HttpRequest::get(url)?, receiver, context))
    }

    pub fn post(
        &self,
        url: &str,
        body: &str,
        receiver: impl Receiver,
        context: &DeliveryContext,
    ) -> Result<Ticket, SubmitError> {
        Ok(self.submit(HttpRequest::post(url, body)?, receiver, context))
    }

    pub fn put(
        &self,
        url: &str,
        body: &str,
        receiver: impl Receiver,
        context: &DeliveryContext,
    ) -> Result<Ticket, SubmitError> {
        Ok(self.submit(HttpRequest::put(url, body)?, receiver, context))
    }
}
