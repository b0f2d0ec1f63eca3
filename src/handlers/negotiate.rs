use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::NegotiateResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NegotiateParams {
    /// Group to join; a random name is generated when omitted.
    pub id: Option<String>,
}

/// Issue connection credentials for a group. The first reference to a group
/// name creates the group.
pub async fn negotiate(
    State(state): State<Arc<AppState>>,
    uid: Option<Extension<String>>,
    Query(params): Query<NegotiateParams>,
) -> (StatusCode, Json<NegotiateResponse>) {
    let group = params
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(random_group_name);

    state.dispatcher.groups().get_or_create(&group);

    // Verified identity when present, anonymous fallback otherwise
    let user = match uid {
        Some(Extension(uid)) => uid,
        None => anonymous_user(),
    };

    let url = state.pubsub.client_access_url(&group, &user);
    info!("Negotiated access for user {} to group {}", user, group);

    (StatusCode::OK, Json(NegotiateResponse { group, user, url }))
}

fn random_group_name() -> String {
    Uuid::new_v4().simple().to_string()[..5].to_string()
}

fn anonymous_user() -> String {
    format!("Anonymous {}", &Uuid::new_v4().simple().to_string()[..4])
}
