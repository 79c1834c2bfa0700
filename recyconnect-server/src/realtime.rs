//! Dashboard update fan-out over Server-Sent Events
//!
//! Every write publishes an entity event followed by a fresh
//! `STATS_UPDATE`. Subscribers that fall behind skip what they missed.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Kind of change carried by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    #[serde(rename = "USER_UPDATE")]
    User,
    #[serde(rename = "ITEM_UPDATE")]
    Item,
    #[serde(rename = "DONATED_ITEM_UPDATE")]
    DonatedItem,
    #[serde(rename = "REPORTED_ITEM_UPDATE")]
    ReportedItem,
    #[serde(rename = "CONCERN_UPDATE")]
    Concern,
    #[serde(rename = "FLAG_UPDATE")]
    Flag,
    #[serde(rename = "STATS_UPDATE")]
    Stats,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER_UPDATE",
            Self::Item => "ITEM_UPDATE",
            Self::DonatedItem => "DONATED_ITEM_UPDATE",
            Self::ReportedItem => "REPORTED_ITEM_UPDATE",
            Self::Concern => "CONCERN_UPDATE",
            Self::Flag => "FLAG_UPDATE",
            Self::Stats => "STATS_UPDATE",
        }
    }
}

/// Payload pushed to dashboard subscribers
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: Value,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl RealtimeEvent {
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Broadcast channel shared by all handlers
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Returns how many received it;
    /// zero subscribers is fine.
    pub fn send(&self, event: RealtimeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Events from now on. Lagged gaps are skipped.
    pub fn subscribe_stream(&self) -> impl Stream<Item = RealtimeEvent> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|res| async move {
            match res {
                Ok(event) => Some(event),
                Err(err) => {
                    tracing::warn!(error = %err, "dashboard subscriber lagged");
                    None
                }
            }
        })
    }

    /// SSE response streaming every event as a named JSON message.
    pub fn sse_response(
        &self,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
        let stream = self.subscribe_stream().map(|event| {
            let sse = Event::default().event(event.kind.as_str());
            Ok(sse
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().comment("unserializable event")))
        });

        Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
    }
}
