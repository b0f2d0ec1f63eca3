use crate::models::*;
use utoipa::OpenApi;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Negotiate connection credentials for a group
#[utoipa::path(
    get,
    path = "/api/negotiate",
    params(
        ("id" = Option<String>, Query, description = "Group to join, generated when omitted")
    ),
    responses(
        (status = 200, description = "Connection credentials issued", body = NegotiateResponse)
    )
)]
#[allow(dead_code)]
pub async fn negotiate_doc() {}

/// Lobby snapshot for a group
#[utoipa::path(
    get,
    path = "/api/groups/{group}/lobby",
    params(
        ("group" = String, Path, description = "Group name")
    ),
    responses(
        (status = 200, description = "Current lobby state", body = LobbySnapshot),
        (status = 404, description = "Unknown group", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn lobby_snapshot_doc() {}

/// Host election for the calling user
#[utoipa::path(
    post,
    path = "/api/groups/{group}/host",
    params(
        ("group" = String, Path, description = "Group name")
    ),
    responses(
        (status = 200, description = "Election outcome", body = HostResponse)
    )
)]
#[allow(dead_code)]
pub async fn group_host_doc() {}

/// Explicit offline signal for a group member
#[utoipa::path(
    post,
    path = "/api/groups/{group}/offline",
    request_body = OfflineRequest,
    params(
        ("group" = String, Path, description = "Group name")
    ),
    responses(
        (status = 200, description = "Signal processed")
    )
)]
#[allow(dead_code)]
pub async fn group_offline_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        negotiate_doc,
        lobby_snapshot_doc,
        group_host_doc,
        group_offline_doc,
    ),
    components(
        schemas(
            HealthResponse,
            NegotiateResponse,
            LobbySnapshot,
            LobbyUser,
            HostResponse,
            OfflineRequest,
            DiagnosticsResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
