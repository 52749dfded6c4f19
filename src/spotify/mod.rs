//! # Spotify Integration Module
//!
//! Talks to Spotify's accounts service and Web API on behalf of a public
//! OAuth 2.0 client (no client secret).
//!
//! ## Core Modules
//!
//! - [`auth`] - Builds the authorization link: client id, redirect uri,
//!   scopes, a fresh `state` and the S256 PKCE challenge.
//! - [`token`] - Token endpoint client for the `authorization_code` and
//!   `refresh_token` grants. Only an HTTP 200 with a complete JSON body
//!   becomes a [`crate::types::Credential`].
//! - [`client`] - Bearer-authenticated Web API calls (profile, player).
//!
//! ## Flow
//!
//! ```text
//! client id ──► auth::build_authorization ──► browser ──► user consent
//!                                                            │
//!        server::CallbackListener ◄── redirect (code, state) ┘
//!                    │
//!                    ▼
//!        token::TokenClient::exchange_code ──► Credential
//!        token::TokenClient::refresh       ──► Credential (every 5/6 of its lifetime)
//! ```
//!
//! Sequencing and refresh scheduling live in [`crate::management::Session`].
//!
//! ## Error Types
//!
//! - [`crate::error::AuthError`] - authorization and token failures
//! - [`crate::error::ApiError`] - Web API failures, with the provider status
//!   kept so callers can single out a 403

pub mod auth;
pub mod client;
pub mod token;
