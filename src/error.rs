//! Error types for the authorization flow and the downstream Web API client.

use std::io;

use reqwest::StatusCode;
use thiserror::Error;

/// Failures of the PKCE authorization flow.
///
/// `InvalidAuth` and `AuthTimeout` come out of the callback listener,
/// `TokenRequestFailed` and `TokenInvalidResponse` out of the token client.
/// None of them is ever retried automatically by the layer that raises it.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider reported an error (for example denied consent) or the
    /// redirect carried a state that does not belong to this attempt.
    #[error("invalid authentication")]
    InvalidAuth,

    /// No redirect arrived before the timer fired.
    #[error("authentication timed out")]
    AuthTimeout,

    /// Transport failure or a non-200 answer from the token endpoint.
    #[error("failed to request token: {0}")]
    TokenRequestFailed(String),

    /// The token endpoint answered 200 but the body is not a usable credential.
    #[error("invalid token response: {0}")]
    TokenInvalidResponse(String),

    /// The local callback endpoint could not be bound or served.
    #[error("callback listener failed: {0}")]
    Listener(#[from] io::Error),

    #[error("credential store failed: {0}")]
    Store(#[from] StoreError),

    #[error("missing client id")]
    MissingClientId,

    #[error("no refresh token available")]
    NoRefreshToken,
}

/// Failures of the persisted credential boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read or write credential file: {0}")]
    Io(#[from] io::Error),

    #[error("credential file is invalid: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failures of authenticated Web API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to send request: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Error envelope returned by the provider.
    #[error("{status} {message}")]
    Provider { status: u16, message: String },
}

impl ApiError {
    /// True for the provider's 403 answer, which callers ignore silently.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ApiError::Provider { status, .. } if *status == StatusCode::FORBIDDEN.as_u16())
    }
}
