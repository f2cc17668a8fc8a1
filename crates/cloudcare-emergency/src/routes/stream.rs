use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use cloudcare_core::CoreError;
use cloudcare_core::events::ClientConnection;
use futures_util::{Stream, StreamExt};

use crate::server::AppState;

/// `GET /api/emergency/stream`
///
/// Each connection takes its own subscription; the stream ends when the
/// client goes away (axum drops it) or the server shuts down.
pub async fn emergency_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, CoreError>>> {
    let connection = ClientConnection::child_of(&state.shutdown);
    let subscription = state.broadcaster.subscribe();
    tracing::info!(
        subscriber_id = subscription.id(),
        subscribers = state.broadcaster.subscriber_count(),
        "Emergency stream opened"
    );

    let frames = subscription.into_frames(connection).map(|frame| {
        let data = frame.data().inspect_err(|e| {
            tracing::warn!(error = %e, "Failed to encode emergency stream frame");
        })?;
        Ok(Event::default().event(frame.event_name()).data(data))
    });

    Sse::new(frames)
}
