use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::models::{ErrorResponse, HostResponse, LobbySnapshot, OfflineRequest};
use crate::AppState;

/// Lobby snapshot for a group: every user ever seen, offline entries
/// included.
pub async fn lobby_snapshot(
    Path(group): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<LobbySnapshot>, (StatusCode, Json<ErrorResponse>)> {
    match state.dispatcher.groups().get(&group) {
        Some(ctx) => Ok(Json(ctx.snapshot())),
        None => {
            let status = StatusCode::NOT_FOUND;
            Err((
                status,
                Json(ErrorResponse {
                    code: status.as_u16(),
                    status: status.to_string(),
                    error: format!("Group '{}' not found", group),
                }),
            ))
        }
    }
}

/// Host election for the verified user. A denied election is a regular
/// response, not an error: the caller inspects `granted`.
pub async fn group_host(
    Path(group): Path<String>,
    State(state): State<Arc<AppState>>,
    uid: Option<Extension<String>>,
) -> Result<Json<HostResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Some(Extension(user)) = uid else {
        let status = StatusCode::UNAUTHORIZED;
        return Err((
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: "Host election requires a user identity".to_string(),
            }),
        ));
    };

    let ctx = state.dispatcher.groups().get_or_create(&group);
    let granted = ctx.host(&user);
    Ok(Json(HostResponse { granted }))
}

/// Explicit offline signal for a group member. A connection id mismatch is a
/// silent no-op, so this always answers 200.
pub async fn group_offline(
    Path(group): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<OfflineRequest>,
) -> StatusCode {
    match state.dispatcher.groups().get(&group) {
        Some(ctx) => ctx.offline(&request.user, &request.connection_id),
        None => debug!("Offline signal for unknown group {}", group),
    }
    StatusCode::OK
}
