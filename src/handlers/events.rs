use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::models::TransportEvent;
use crate::AppState;

/// Transport event webhook: the single entry point for connection lifecycle
/// and data events produced by the pub-sub delivery service.
///
/// Always answers 200: decode or apply failures inside the dispatcher are
/// logged there and must never bounce an event back to the transport.
pub async fn handle_transport_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<TransportEvent>,
) -> StatusCode {
    let dispatcher = &state.dispatcher;
    match event {
        TransportEvent::Connected(connected) => {
            dispatcher.on_connected(&connected.connection_id, &connected.user, &connected.group);
        }
        TransportEvent::Disconnected(disconnected) => {
            dispatcher.on_disconnected(&disconnected.connection_id);
        }
        TransportEvent::Message(message) => {
            dispatcher.on_data(&message.connection_id, &message.data);
        }
    }
    StatusCode::OK
}
