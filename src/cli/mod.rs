//! # CLI Module
//!
//! User-facing commands of the `spotauth` binary. Each command builds a
//! [`Session`] from the environment, lets it obtain or renew the credential,
//! and reports the outcome with the crate's `info!` / `success!` /
//! `warning!` / `error!` macros.
//!
//! ## Commands
//!
//! - [`auth`] - Interactive PKCE authorization; stores client id and refresh token
//! - [`refresh`] - One refresh grant with the stored refresh token
//! - [`profile`] - Prints the authenticated user's profile
//! - [`player`] - Pause / skip playback
//! - [`watch`] - Keeps the credential fresh until interrupted
//!
//! ## Usage
//!
//! ```bash
//! spotauth auth --client-id 0123456789abcdef   # first run
//! spotauth profile                             # refreshes silently
//! spotauth player next
//! spotauth watch                               # renews at 5/6 of each lifetime
//! ```

mod auth;
mod player;
mod profile;
mod refresh;
mod watch;

pub use auth::auth;
pub use player::PlayerAction;
pub use player::player;
pub use profile::profile;
pub use refresh::refresh;
pub use watch::watch;

use crate::{
    browser::Browser,
    config::Settings,
    error,
    error::AuthError,
    management::{FileStore, Session},
};

pub type CliSession = Session<FileStore, Browser>;

fn session() -> CliSession {
    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => error!("Invalid configuration. Err: {}", e),
    };

    Session::new(settings, FileStore::default(), Browser)
}

fn describe(e: &AuthError) -> String {
    match e {
        AuthError::MissingClientId => format!(
            "{}. Run `spotauth auth --client-id <ID>` or set SPOTIFY_CLIENT_ID.",
            e
        ),
        AuthError::NoRefreshToken => format!("{}. Run `spotauth auth` first.", e),
        AuthError::AuthTimeout => format!("{}. Run the command again to retry.", e),
        _ => e.to_string(),
    }
}
