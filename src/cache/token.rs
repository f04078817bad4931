use std::fmt;

use serde::Deserialize;

pub const TOKEN_TYPE_DEFAULT: &str = "Bearer";

/// Access token as issued by the token endpoint.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Token {
    #[serde(rename = "access_token")]
    pub value: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// lifetime reported by the issuer, seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl Token {
    pub fn new(value: String) -> Self {
        Self { value, token_type: default_token_type(), expires_in: None }
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.value)
    }
}

// token value stays out of logs
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

fn default_token_type() -> String {
    TOKEN_TYPE_DEFAULT.to_string()
}
