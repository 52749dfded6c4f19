use axum::{Extension, extract::Query};
use tokio::sync::mpsc::{Sender, error::TrySendError};
use tracing::debug;

use crate::types::CallbackResponse;

pub const ACKNOWLEDGEMENT: &str = "Authorization received. You can close this window and return to the terminal.";

/// Captures the provider redirect.
///
/// The first response is published on the single-slot channel; anything that
/// arrives while the slot is taken is dropped without waiting, so a second
/// redirect can neither block this handler nor replace the first result.
pub async fn callback(
    Query(response): Query<CallbackResponse>,
    Extension(slot): Extension<Sender<CallbackResponse>>,
) -> &'static str {
    match slot.try_send(response) {
        Ok(()) => debug!("callback response captured"),
        Err(TrySendError::Full(_)) => debug!("callback response discarded, one already pending"),
        Err(TrySendError::Closed(_)) => debug!("callback response discarded, nobody waiting"),
    }

    ACKNOWLEDGEMENT
}
