use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    /// 为 false 时返回 JSON 而不是 302
    #[serde(default)]
    pub redirect: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}
