//! Tracing capture for unit tests.
//!
//! Records the events a future emits so tests can assert on structured
//! fields without installing a global subscriber.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Arc, Mutex},
};

use tracing::{
    Event,
    Level,
    Metadata,
    Subscriber,
    field::{Field, Visit},
    instrument::WithSubscriber,
    span::{Attributes, Id, Record},
};

#[derive(Clone, Default)]
struct RecordingSubscriber {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingSubscriber {
    fn take_events(&self) -> Vec<RecordedEvent> {
        let mut guard = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *guard)
    }
}

/// One captured event.
#[derive(Debug)]
pub(crate) struct RecordedEvent {
    level: Level,
    fields: HashMap<String, String>,
    message: Option<String>,
}

impl RecordedEvent {
    pub(crate) const fn level(&self) -> Level { self.level }

    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub(crate) fn message(&self) -> Option<&str> { self.message.as_deref() }
}

#[derive(Default)]
struct FieldRecorder {
    fields: HashMap<String, String>,
    message: Option<String>,
}

impl Visit for FieldRecorder {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let value = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_owned(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_owned(), value.to_owned());
    }
}

impl Subscriber for RecordingSubscriber {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool { true }

    fn new_span(&self, _attrs: &Attributes<'_>) -> Id { Id::from_u64(1) }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut recorder = FieldRecorder::default();
        event.record(&mut recorder);
        let record = RecordedEvent {
            level: *event.metadata().level(),
            fields: recorder.fields,
            message: recorder.message,
        };
        let mut guard = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(record);
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Run `future` under a recording subscriber and return its output together
/// with every event it emitted while being polled.
pub(crate) async fn capture_events<F: Future>(future: F) -> (F::Output, Vec<RecordedEvent>) {
    let subscriber = RecordingSubscriber::default();
    let output = future.with_subscriber(subscriber.clone()).await;
    (output, subscriber.take_events())
}
