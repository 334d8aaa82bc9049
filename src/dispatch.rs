//! Inbound message routing.
//!
//! Runs on the transport reader thread, so it must never block: responses
//! resolve the correlation registry in-place, events are handed to a
//! one-shot worker thread per event. A slow or panicking handler therefore
//! cannot starve frame reading or affect other events.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use tracing::{debug, error, trace};

use crate::protocol::{EventKind, Message, UiEvent};
use crate::registry::PendingRequests;
use crate::transport::MessageSink;
use crate::value::Value;

pub type EventHandler = Arc<dyn Fn(UiEvent) + Send + Sync>;

pub struct Dispatcher {
    requests: Arc<PendingRequests>,
    handler: RwLock<Option<EventHandler>>,
}

impl Dispatcher {
    pub fn new(requests: Arc<PendingRequests>) -> Self {
        Self {
            requests,
            handler: RwLock::new(None),
        }
    }

    pub fn set_event_handler(&self, handler: EventHandler) {
        *self.handler.write() = Some(handler);
    }

    fn dispatch(&self, message: Message) {
        match message {
            Message::Event { node_id, event } => self.dispatch_event(node_id, event),

            Message::ClipboardResponse { request_id, text } => {
                self.requests.resolve(&request_id, Value::from(text));
            }
            Message::FileDialogResponse { request_id, paths } => {
                self.requests.resolve(&request_id, Value::from(paths));
            }
            Message::PreferenceResponse { request_id, value } => {
                self.requests.resolve(&request_id, value);
            }
            Message::ServiceResponse { request_id, result } => {
                self.requests.resolve(&request_id, result);
            }

            // Render-direction traffic has no business arriving inbound.
            other => debug!(message = other.tag(), "ignoring unexpected inbound message"),
        }
    }

    fn dispatch_event(&self, node_id: String, raw: String) {
        let Some(handler) = self.handler.read().clone() else {
            trace!(node_id = %node_id, event = %raw, "event dropped, no handler registered");
            return;
        };

        let event = UiEvent {
            kind: EventKind::parse(&raw),
            node_id,
            raw,
        };

        thread::spawn(move || {
            let context = (event.node_id.clone(), event.raw.clone());
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(event)));
            if outcome.is_err() {
                error!(
                    node_id = %context.0,
                    event = %context.1,
                    "event handler panicked; other events are unaffected"
                );
            }
        });
    }
}

impl MessageSink for Dispatcher {
    fn deliver(&self, message: Message) {
        self.dispatch(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn dispatcher() -> (Arc<PendingRequests>, Dispatcher) {
        let requests = Arc::new(PendingRequests::new());
        let dispatcher = Dispatcher::new(Arc::clone(&requests));
        (requests, dispatcher)
    }

    #[test]
    fn responses_resolve_pending_requests() {
        let (requests, dispatcher) = dispatcher();
        requests.create("clip");
        dispatcher.deliver(Message::ClipboardResponse {
            request_id: "clip".to_string(),
            text: Some("copied".to_string()),
        });
        assert_eq!(
            requests.wait("clip", Duration::from_millis(100)),
            Some(Value::from("copied"))
        );

        requests.create("files");
        dispatcher.deliver(Message::FileDialogResponse {
            request_id: "files".to_string(),
            paths: vec!["/tmp/a".to_string()],
        });
        assert_eq!(
            requests.wait("files", Duration::from_millis(100)),
            Some(Value::from(vec!["/tmp/a"]))
        );
    }

    #[test]
    fn response_for_unknown_id_is_ignored() {
        let (_requests, dispatcher) = dispatcher();
        dispatcher.deliver(Message::ServiceResponse {
            request_id: "nobody".to_string(),
            result: Value::Null,
        });
    }

    #[test]
    fn events_reach_the_handler_off_thread() {
        let (_requests, dispatcher) = dispatcher();
        let seen: Arc<Mutex<Vec<UiEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.set_event_handler(Arc::new(move |event| {
            sink.lock().push(event);
        }));

        dispatcher.deliver(Message::Event {
            node_id: "0.1".to_string(),
            event: "change:42".to_string(),
        });

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while seen.lock().is_empty() {
            assert!(std::time::Instant::now() < deadline, "handler never ran");
            thread::sleep(Duration::from_millis(5));
        }

        let events = seen.lock();
        assert_eq!(events[0].node_id, "0.1");
        assert_eq!(events[0].kind, EventKind::Change("42".to_string()));
        assert_eq!(events[0].raw, "change:42");
    }

    #[test]
    fn panicking_handler_does_not_block_later_events() {
        let (_requests, dispatcher) = dispatcher();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.set_event_handler(Arc::new(move |event: UiEvent| {
            if event.node_id == "bad" {
                panic!("boom");
            }
            sink.lock().push(event.node_id);
        }));

        dispatcher.deliver(Message::Event {
            node_id: "bad".to_string(),
            event: "tap".to_string(),
        });
        dispatcher.deliver(Message::Event {
            node_id: "good".to_string(),
            event: "tap".to_string(),
        });

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while seen.lock().is_empty() {
            assert!(std::time::Instant::now() < deadline, "second event lost");
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(seen.lock().as_slice(), ["good"]);
    }

    #[test]
    fn event_without_handler_is_dropped_quietly() {
        let (_requests, dispatcher) = dispatcher();
        dispatcher.deliver(Message::Event {
            node_id: "0".to_string(),
            event: "tap".to_string(),
        });
    }
}
