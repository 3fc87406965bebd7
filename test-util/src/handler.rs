//! Handler that records callbacks for assertions.

use std::time::Duration;

use async_trait::async_trait;
use tokio::{sync::mpsc, time::timeout};
use wsclient::{ClientError, Connection, Handler, Message};

/// One callback observed by [`RecordingHandler`].
#[derive(Debug)]
pub enum Event {
    /// `on_message` was called.
    Message(Message),
    /// `on_disconnect` was called.
    Disconnect(Option<ClientError>),
}

/// Forwards every callback into a channel.
#[derive(Debug)]
pub struct RecordingHandler {
    events: mpsc::UnboundedSender<Event>,
}

impl RecordingHandler {
    /// Create a handler and the receiving end of its event channel.
    #[must_use]
    pub fn new() -> (Self, Events) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, Events { rx })
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn on_message(&self, _connection: &Connection, message: Message) {
        self.events.send(Event::Message(message)).ok();
    }

    async fn on_disconnect(&self, _connection: &Connection, error: Option<ClientError>) {
        self.events.send(Event::Disconnect(error)).ok();
    }
}

/// Receiving end of a [`RecordingHandler`].
#[derive(Debug)]
pub struct Events {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Events {
    /// Wait up to `limit` for the next event.
    ///
    /// # Panics
    ///
    /// Panics if no event arrives in time or the handler was dropped.
    pub async fn next(&mut self, limit: Duration) -> Event {
        timeout(limit, self.rx.recv())
            .await
            .expect("event timed out")
            .expect("handler dropped")
    }
}
