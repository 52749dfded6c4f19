use std::fmt;

use reqwest::{Client, Method, RequestBuilder, Response};
use url::Url;

use crate::{
    config::Settings,
    error::ApiError,
    types::{ErrorEnvelope, UserProfile},
};

/// Repeat setting of the active player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    Track,
    Context,
    Off,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Track => "track",
            RepeatMode::Context => "context",
            RepeatMode::Off => "off",
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal Web API client authenticated with a bearer token.
///
/// The token is swapped with [`ApiClient::set_token`] whenever the session
/// renews its credential.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    api_url: Url,
    token: String,
}

impl ApiClient {
    pub fn new(settings: &Settings, token: impl Into<String>) -> Self {
        ApiClient {
            http: Client::new(),
            api_url: settings.api_url.clone(),
            token: token.into(),
        }
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    pub async fn user_profile(&self) -> Result<UserProfile, ApiError> {
        let response = self.send(self.request(Method::GET, &["v1", "me"])).await?;
        Ok(response.json::<UserProfile>().await?)
    }

    pub async fn pause(&self) -> Result<(), ApiError> {
        self.send(self.request(Method::PUT, &["v1", "me", "player", "pause"]))
            .await
            .map(|_| ())
    }

    pub async fn resume(&self) -> Result<(), ApiError> {
        self.send(self.request(Method::PUT, &["v1", "me", "player", "play"]))
            .await
            .map(|_| ())
    }

    pub async fn set_shuffle(&self, shuffle: bool) -> Result<(), ApiError> {
        self.set_state("shuffle", if shuffle { "true" } else { "false" })
            .await
    }

    pub async fn set_repeat(&self, mode: RepeatMode) -> Result<(), ApiError> {
        self.set_state("repeat", mode.as_str()).await
    }

    pub async fn next(&self) -> Result<(), ApiError> {
        self.send(self.request(Method::POST, &["v1", "me", "player", "next"]))
            .await
            .map(|_| ())
    }

    pub async fn previous(&self) -> Result<(), ApiError> {
        self.send(self.request(Method::POST, &["v1", "me", "player", "previous"]))
            .await
            .map(|_| ())
    }

    async fn set_state(&self, endpoint: &str, state: &str) -> Result<(), ApiError> {
        let request = self
            .request(Method::PUT, &["v1", "me", "player", endpoint])
            .query(&[("state", state)]);
        self.send(request).await.map(|_| ())
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        let request = self.http.request(method.clone(), url).bearer_auth(&self.token);
        if method == Method::GET {
            request
        } else {
            // player endpoints reject bodyless writes without it
            request.header(reqwest::header::CONTENT_LENGTH, 0)
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => ApiError::Provider {
                status: envelope.error.status,
                message: envelope.error.message,
            },
            Err(_) => ApiError::Provider {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string(),
            },
        })
    }
}
