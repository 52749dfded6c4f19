use crate::{
    cli::{describe, session},
    error,
    spotify::client::{ApiClient, RepeatMode},
    success,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Pause,
    Resume,
    Shuffle(bool),
    Repeat(RepeatMode),
    Next,
    Previous,
}

pub async fn player(action: PlayerAction) {
    let session = session();

    let credential = match session.authenticate().await {
        Ok(c) => c,
        Err(e) => error!("Authentication failed. Err: {}", describe(&e)),
    };

    let client = ApiClient::new(session.settings(), credential.access_token);
    let result = match action {
        PlayerAction::Pause => client.pause().await,
        PlayerAction::Resume => client.resume().await,
        PlayerAction::Shuffle(enabled) => client.set_shuffle(enabled).await,
        PlayerAction::Repeat(mode) => client.set_repeat(mode).await,
        PlayerAction::Next => client.next().await,
        PlayerAction::Previous => client.previous().await,
    };

    match result {
        Ok(()) => success!("Done."),
        // restricted for this account or device, not worth reporting
        Err(e) if e.is_forbidden() => {}
        Err(e) => error!("Player command failed. Err: {}", e),
    }
}
