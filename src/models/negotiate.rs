use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Connection credentials handed to a client joining a group: the resolved
/// group name, the identity the token was issued for, and the transport URL
/// carrying the access token.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct NegotiateResponse {
    pub group: String,
    pub user: String,
    pub url: String,
}
