const OAUTH_STATE_PREFIX: &str = "oauth:state:";

pub fn oauth_state_key(state: &str) -> String {
    format!("{}{}", OAUTH_STATE_PREFIX, state)
}
