//! Configuration for the authorization flow.
//!
//! Values come from environment variables, optionally loaded from a `.env`
//! file in the local data directory, and fall back to Spotify's public
//! endpoints. The redirect URI must match the one registered for the
//! application in the Spotify developer dashboard.

use std::{env, path::PathBuf, time::Duration};

use url::Url;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(15);

pub const REQUIRED_SCOPES: [&str; 4] = [
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
    "playlist-read-private",
];

/// Directory holding the `.env` file and the persisted credential.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotauth");
    path
}

/// Loads environment variables from `<data_local_dir>/spotauth/.env`.
///
/// The directory is created if needed. A missing `.env` file is fine, all
/// settings have defaults except the client id.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(format!("cannot parse {}: {}", path.display(), e)),
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub accounts_url: Url,
    pub api_url: Url,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
    pub callback_timeout: Duration,
    pub client_id: Option<String>,
}

impl Settings {
    pub fn new(accounts_url: &str, api_url: &str, redirect_uri: &str) -> Result<Self, String> {
        Ok(Settings {
            accounts_url: parse_url("accounts", accounts_url)?,
            api_url: parse_url("api", api_url)?,
            redirect_uri: parse_redirect_uri(redirect_uri)?,
            scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            client_id: None,
        })
    }

    /// Builds settings from the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `SPOTIFY_ACCOUNTS_URL` | `https://accounts.spotify.com` |
    /// | `SPOTIFY_API_URL` | `https://api.spotify.com` |
    /// | `SPOTIFY_REDIRECT_URI` | `http://127.0.0.1:8888/callback` |
    /// | `SPOTIFY_AUTH_SCOPE` | the four player/playlist scopes |
    /// | `SPOTAUTH_CALLBACK_TIMEOUT_SECS` | `15` |
    /// | `SPOTIFY_CLIENT_ID` | unset |
    pub fn from_env() -> Result<Self, String> {
        let mut settings = Settings::new(
            &env_or("SPOTIFY_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL),
            &env_or("SPOTIFY_API_URL", DEFAULT_API_URL),
            &env_or("SPOTIFY_REDIRECT_URI", DEFAULT_REDIRECT_URI),
        )?;

        if let Ok(scope) = env::var("SPOTIFY_AUTH_SCOPE") {
            let scopes: Vec<String> = scope.split_whitespace().map(str::to_string).collect();
            if !scopes.is_empty() {
                settings.scopes = scopes;
            }
        }

        if let Ok(secs) = env::var("SPOTAUTH_CALLBACK_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| format!("SPOTAUTH_CALLBACK_TIMEOUT_SECS: {}", e))?;
            settings.callback_timeout = Duration::from_secs(secs);
        }

        settings.client_id = env::var("SPOTIFY_CLIENT_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());

        Ok(settings)
    }

    pub fn authorize_url(&self) -> Url {
        join(&self.accounts_url, &["authorize"])
    }

    pub fn token_url(&self) -> Url {
        join(&self.accounts_url, &["api", "token"])
    }

    pub fn api_endpoint(&self, segments: &[&str]) -> Url {
        join(&self.api_url, segments)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_url(name: &str, raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid {} url {:?}: {}", name, raw, e))?;
    if url.cannot_be_a_base() {
        return Err(format!("invalid {} url {:?}: not a base url", name, raw));
    }
    Ok(url)
}

fn parse_redirect_uri(raw: &str) -> Result<Url, String> {
    let url = parse_url("redirect", raw)?;
    if url.scheme() != "http" {
        return Err(format!("redirect uri {:?} must use plain http", raw));
    }
    if url.host_str().is_none() || url.port_or_known_default().is_none() {
        return Err(format!("redirect uri {:?} needs a host and port", raw));
    }
    Ok(url)
}

/// Appends path segments to a base url, keeping whatever path it already has.
fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
