use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Access/refresh token pair with its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Duration,
    pub obtained_at: DateTime<Utc>,
}

impl Credential {
    /// Saturates at the latest representable instant for absurd lifetimes.
    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.expires_in)
            .ok()
            .and_then(|lifetime| self.obtained_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }
}

/// Raw body of a successful token endpoint answer.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Authorization link plus the state expected back on the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Query parameters captured from the provider redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub error: String,
}

/// What the credential store keeps between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAuth {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub refresh_token: String,
}

/// Where the flow coordinator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingConsent,
    ExchangingCode,
    Authenticated,
    RefreshScheduled,
    Refreshing,
    Failed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Idle => "idle",
            FlowState::AwaitingConsent => "awaiting consent",
            FlowState::ExchangingCode => "exchanging code",
            FlowState::Authenticated => "authenticated",
            FlowState::RefreshScheduled => "refresh scheduled",
            FlowState::Refreshing => "refreshing",
            FlowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "display_name", default)]
    pub name: Option<String>,
    pub followers: Followers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Followers {
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    #[serde(default)]
    pub message: String,
}

#[derive(Tabled)]
pub struct ProfileTableRow {
    pub name: String,
    pub followers: u64,
}
