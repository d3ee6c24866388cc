use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DispatchParams {
    /// Key of the user whose open streams receive the value.
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
    /// Any JSON value. Delivered to clients as `{"data": <value>}`.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub value: Value,
}

impl DispatchParams {
    /// The target user key, if one was supplied and is not empty.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|user_id| !user_id.is_empty())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchResponse {
    /// Number of streams that accepted the value.
    pub sent: usize,
}
