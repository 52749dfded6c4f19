//! # API Module
//!
//! HTTP endpoints served by the short-lived local listener that catches the
//! provider's redirect at the end of the OAuth 2.0 PKCE consent step.
//!
//! ## Endpoints
//!
//! - [`callback`] - Receives `code`, `state` and `error` from the redirect,
//!   hands them to the waiting flow through a single-slot channel and answers
//!   with a plain-text acknowledgement for the browser.
//!
//! The handler does no validation of its own. Comparing the state and
//! deciding between success and failure happens in
//! [`crate::server::CallbackListener::wait_for_code`].

mod callback;

pub use callback::ACKNOWLEDGEMENT;
pub use callback::callback;
