use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StreamParams {
    /// Key of the user whose pushed values this stream receives.
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
}

impl StreamParams {
    /// The user key, if one was supplied and is not empty.
    pub fn user_id(self) -> Option<String> {
        self.user_id.filter(|user_id| !user_id.is_empty())
    }
}
