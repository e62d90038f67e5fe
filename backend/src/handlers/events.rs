//! Server-sent change feed

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use serde::Deserialize;
use shared::LedgerEvent;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only forward events about this SKU
    pub sku: Option<String>,
}

fn to_sse(event: &LedgerEvent) -> Event {
    match Event::default().event(event.kind()).json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            tracing::error!(kind = event.kind(), error = %e, "Failed to encode change event");
            Event::default().event("error").data("unencodable event")
        }
    }
}

/// Stream ledger changes as they happen. A subscriber that falls behind
/// gets a `lagged` event carrying the number of missed changes.
pub async fn stream_events(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<EventsQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    check_permission(&current_user.0, "events", "read")?;

    let sku = query.sku.map(|s| s.trim().to_uppercase());
    tracing::debug!(
        user = %current_user.0.username,
        sku = ?sku,
        subscribers = state.services.feed.subscriber_count() + 1,
        "Change feed subscriber connected"
    );

    let stream = BroadcastStream::new(state.services.feed.subscribe()).filter_map(move |message| {
        match message {
            Ok(event) => {
                if let Some(sku) = &sku {
                    if event.sku() != Some(sku.as_str()) {
                        return None;
                    }
                }
                Some(Ok(to_sse(&event)))
            }
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                Some(Ok(Event::default().event("lagged").data(missed.to_string())))
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
