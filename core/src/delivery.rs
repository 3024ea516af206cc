//! Getting an outcome to its receiver on the right thread.
//!
//! # Design
//! A `Receiver` is consumed by its single invocation (`self: Box<Self>`), so
//! "called twice" cannot be written down. Where that invocation happens is
//! chosen by the `DeliveryContext` the caller hands to `submit`: either the
//! worker itself, or a `DeliveryQueue` owned by some other thread (typically
//! the engine's main thread) that drains it with `pump`. The context is a
//! value captured at submission, not thread-local state looked up later.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::dispatcher::RequestId;
use crate::outcome::{Outcome, ResultEvent};

/// The single callback slot notified once per request.
///
/// `on_result` fires when the server answered (any status), `on_error` when
/// the call never completed.
pub trait Receiver: Send + 'static {
    fn on_result(self: Box<Self>, event: ResultEvent);
    fn on_error(self: Box<Self>, message: String);
}

/// A `Receiver` made of two closures, only one of which ever runs.
pub struct FnReceiver<R, E> {
    on_result: R,
    on_error: E,
}

impl<R, E> FnReceiver<R, E>
where
    R: FnOnce(ResultEvent) + Send + 'static,
    E: FnOnce(String) + Send + 'static,
{
    pub fn new(on_result: R, on_error: E) -> Self {
        Self { on_result, on_error }
    }
}

impl<R, E> Receiver for FnReceiver<R, E>
where
    R: FnOnce(ResultEvent) + Send + 'static,
    E: FnOnce(String) + Send + 'static,
{
    fn on_result(self: Box<Self>, event: ResultEvent) {
        (self.on_result)(event)
    }

    fn on_error(self: Box<Self>, message: String) {
        (self.on_error)(message)
    }
}

/// A finished request waiting to be handed to its receiver.
pub struct Delivery {
    id: RequestId,
    outcome: Outcome,
    receiver: Box<dyn Receiver>,
}

impl Delivery {
    pub(crate) fn new(id: RequestId, outcome: Outcome, receiver: Box<dyn Receiver>) -> Self {
        Self {
            id,
            outcome,
            receiver,
        }
    }

    /// Invoke the receiver on the current thread.
    ///
    /// A panicking receiver is logged and contained so it cannot take down
    /// the worker or stop a queue from draining.
    pub fn run(self) {
        let Delivery {
            id,
            outcome,
            receiver,
        } = self;
        let result = catch_unwind(AssertUnwindSafe(move || match outcome.into_event() {
            Ok(event) => receiver.on_result(event),
            Err(err) => receiver.on_error(err.to_string()),
        }));
        if result.is_err() {
            error!(request_id = %id, "receiver panicked during delivery");
        }
    }
}

/// Where a receiver is invoked.
#[derive(Debug, Clone)]
pub enum DeliveryContext {
    /// On the worker thread, right after the call completes.
    Worker,
    /// On whichever thread pumps the queue behind this handle.
    Queue(QueueHandle),
}

impl DeliveryContext {
    pub(crate) fn post(&self, delivery: Delivery) {
        match self {
            DeliveryContext::Worker => delivery.run(),
            DeliveryContext::Queue(handle) => handle.post(delivery),
        }
    }
}

/// Sending side of a `DeliveryQueue`. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    name: Arc<str>,
    sender: mpsc::Sender<Delivery>,
}

impl QueueHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn post(&self, delivery: Delivery) {
        let id = delivery.id;
        if self.sender.send(delivery).is_err() {
            warn!(
                request_id = %id,
                queue = %self.name,
                "delivery queue dropped; outcome discarded"
            );
        }
    }
}

/// Deliveries posted by workers, run by the thread that owns the queue.
///
/// This is the handoff for hosts whose callbacks must run on one thread,
/// such as an engine main loop calling `pump` once per frame.
pub struct DeliveryQueue {
    handle: QueueHandle,
    receiver: mpsc::Receiver<Delivery>,
}

impl DeliveryQueue {
    pub fn new(name: &str) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            handle: QueueHandle {
                name: Arc::from(name),
                sender,
            },
            receiver,
        }
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    /// A context that routes deliveries to this queue.
    pub fn context(&self) -> DeliveryContext {
        DeliveryContext::Queue(self.handle())
    }

    /// Run every delivery already queued. Never blocks.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        while let Ok(delivery) = self.receiver.try_recv() {
            delivery.run();
            delivered += 1;
        }
        delivered
    }

    /// Wait up to `timeout` for the first delivery, then drain the rest.
    pub fn pump_timeout(&self, timeout: Duration) -> usize {
        match self.receiver.recv_timeout(timeout) {
            Ok(delivery) => {
                delivery.run();
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new("main")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::sync::Mutex;
    use std::thread;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording(log: &Log) -> Box<dyn Receiver> {
        let on_result = Arc::clone(log);
        let on_error = Arc::clone(log);
        Box::new(FnReceiver::new(
            move |event: ResultEvent| {
                on_result
                    .lock()
                    .unwrap()
                    .push(format!("result {} {:?}", event.status_code, event.body))
            },
            move |message: String| on_error.lock().unwrap().push(format!("error {message}")),
        ))
    }

    fn success(body: &str) -> Outcome {
        Outcome::Success {
            status_code: 200,
            status_message: "OK".into(),
            body: body.into(),
        }
    }

    #[test]
    fn run_routes_success_to_on_result() {
        let log = Log::default();
        Delivery::new(RequestId::new(), success("ok"), recording(&log)).run();
        assert_eq!(*log.lock().unwrap(), vec![r#"result 200 Some("ok")"#.to_string()]);
    }

    #[test]
    fn run_routes_transport_error_to_on_error() {
        let log = Log::default();
        let outcome = TransportError::malformed_url("bad").into();
        Delivery::new(RequestId::new(), outcome, recording(&log)).run();
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("error malformed url"));
    }

    #[test]
    fn panicking_receiver_is_contained() {
        let receiver = FnReceiver::new(|_: ResultEvent| panic!("boom"), |_: String| {});
        Delivery::new(RequestId::new(), success(""), Box::new(receiver)).run();
    }

    #[test]
    fn queue_runs_deliveries_on_pumping_thread() {
        let queue = DeliveryQueue::new("test");
        let handle = queue.handle();
        let ran_on = Arc::new(Mutex::new(None));

        let ran_on_worker = Arc::clone(&ran_on);
        thread::spawn(move || {
            let receiver = FnReceiver::new(
                move |_: ResultEvent| *ran_on_worker.lock().unwrap() = Some(thread::current().id()),
                |_: String| {},
            );
            DeliveryContext::Queue(handle).post(Delivery::new(
                RequestId::new(),
                success("ok"),
                Box::new(receiver),
            ));
        })
        .join()
        .unwrap();

        assert!(ran_on.lock().unwrap().is_none(), "nothing runs before pump");
        assert_eq!(queue.pump(), 1);
        assert_eq!(*ran_on.lock().unwrap(), Some(thread::current().id()));
        assert_eq!(queue.pump(), 0);
    }

    #[test]
    fn pump_timeout_returns_zero_when_idle() {
        let queue = DeliveryQueue::default();
        assert_eq!(queue.handle().name(), "main");
        assert_eq!(queue.pump_timeout(Duration::from_millis(10)), 0);
    }

    #[test]
    fn post_to_dropped_queue_does_not_panic() {
        let log = Log::default();
        let handle = DeliveryQueue::new("gone").handle();
        DeliveryContext::Queue(handle).post(Delivery::new(RequestId::new(), success("x"), recording(&log)));
        assert!(log.lock().unwrap().is_empty());
    }
}
