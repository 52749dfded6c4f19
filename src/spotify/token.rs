use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::{
    config::Settings,
    error::AuthError,
    types::{Credential, TokenResponse},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the provider's token endpoint.
///
/// Covers the two grant types a public PKCE client needs: exchanging an
/// authorization code and refreshing an access token. No client secret is
/// ever sent; `client_id` travels in every request body instead. Persisting
/// the returned credential is up to the caller.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: Client,
    token_url: Url,
    redirect_uri: String,
    timeout: Duration,
}

impl TokenClient {
    pub fn new(settings: &Settings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(http: Client, settings: &Settings) -> Self {
        TokenClient {
            http,
            token_url: settings.token_url(),
            redirect_uri: settings.redirect_uri.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Overrides how long a single token request may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exchanges an authorization code for a credential.
    ///
    /// `verifier` must be the code verifier whose challenge was sent in the
    /// authorization link that produced `code`.
    pub async fn exchange_code(
        &self,
        client_id: &str,
        verifier: &str,
        code: &str,
    ) -> Result<Credential, AuthError> {
        self.request_token(
            client_id,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
                ("code_verifier", verifier),
            ],
        )
        .await
    }

    /// Trades a refresh token for a new credential.
    ///
    /// The provider may rotate the refresh token; the one in the returned
    /// credential is the one to keep.
    pub async fn refresh(&self, client_id: &str, refresh_token: &str) -> Result<Credential, AuthError> {
        self.request_token(
            client_id,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
        )
        .await
    }

    async fn request_token(
        &self,
        client_id: &str,
        parameters: &[(&str, &str)],
    ) -> Result<Credential, AuthError> {
        let mut form: Vec<(&str, &str)> = parameters.to_vec();
        form.push(("client_id", client_id));

        let grant_type = parameters
            .iter()
            .find(|(key, _)| *key == "grant_type")
            .map(|(_, value)| *value)
            .unwrap_or_default();
        debug!(grant_type, url = %self.token_url, "requesting token");

        let response = self
            .http
            .post(self.token_url.clone())
            .timeout(self.timeout)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::TokenRequestFailed(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(grant_type, %status, "token endpoint refused request");
            return Err(AuthError::TokenRequestFailed(format!(
                "token endpoint answered {}",
                status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::TokenRequestFailed(e.to_string()))?;

        parse_token_response(&body)
    }
}

/// Turns a 200 body into a credential, rejecting anything that would yield
/// an empty token or a non-positive lifetime.
pub fn parse_token_response(body: &[u8]) -> Result<Credential, AuthError> {
    let token: TokenResponse = serde_json::from_slice(body)
        .map_err(|e| AuthError::TokenInvalidResponse(e.to_string()))?;

    if token.access_token.is_empty() {
        return Err(AuthError::TokenInvalidResponse(
            "empty access_token".to_string(),
        ));
    }
    if token.refresh_token.is_empty() {
        return Err(AuthError::TokenInvalidResponse(
            "empty refresh_token".to_string(),
        ));
    }
    if token.expires_in == 0 {
        return Err(AuthError::TokenInvalidResponse(
            "expires_in must be positive".to_string(),
        ));
    }

    Ok(Credential {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_in: Duration::from_secs(token.expires_in),
        obtained_at: Utc::now(),
    })
}
