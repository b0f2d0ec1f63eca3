use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for an error
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}
