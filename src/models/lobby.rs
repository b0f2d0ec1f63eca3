use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One member in a group lobby view. Status is the display form of the
/// stored state: "host", "online" or "offline".
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyUser {
    pub connection_id: String,
    pub name: String,
    pub status: String,
}

/// Serializable lobby snapshot consumed by the UI. Lists every user ever
/// seen in the group, offline entries included.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct LobbySnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    pub users: Vec<LobbyUser>,
}

impl LobbySnapshot {
    pub fn new(users: Vec<LobbyUser>) -> Self {
        Self {
            kind: "lobby".to_string(),
            users,
        }
    }
}

/// Response for a host election request.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct HostResponse {
    pub granted: bool,
}

/// Explicit offline signal for a group member. The connection id guards
/// against a stale disconnect racing a fresh reconnect.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfflineRequest {
    pub user: String,
    pub connection_id: String,
}
