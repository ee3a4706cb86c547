use serde::{Deserialize, Serialize};

/// Seconds before the real expiry at which a token is already considered stale
const EXPIRY_BUFFER_SECS: i64 = 300;

/// OAuth2 credential persisted between runs
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry time as seconds since Unix epoch
    pub expires_at: i64,
    /// Scopes granted to the access token
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Check if the access token is expired or about to expire (within 5 minutes)
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.expires_at < (now + EXPIRY_BUFFER_SECS)
    }

    /// Whether the granted scopes are a superset of `required`
    pub fn covers(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|scope| self.scopes.iter().any(|granted| granted == scope))
    }
}
