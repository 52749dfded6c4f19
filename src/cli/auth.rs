use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    cli::{describe, session},
    error,
    management::CredentialStore,
    success,
    types::FlowState,
};

pub async fn auth(client_id: Option<String>) {
    let session = session();

    if let Some(id) = client_id {
        if let Err(e) = session.store().save_client_id(id.trim()).await {
            error!("Failed to save client id. Err: {}", e);
        }
    }

    let pb = ProgressBar::new_spinner();
    pb.set_message("Preparing authorization...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    let mut states = session.subscribe();
    let follow = {
        let pb = pb.clone();
        tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = *states.borrow_and_update();
                match state {
                    FlowState::AwaitingConsent => {
                        pb.set_message("Waiting for authorization in the browser...")
                    }
                    FlowState::ExchangingCode => pb.set_message("Exchanging authorization code..."),
                    _ => {}
                }
            }
        })
    };

    let result = session.authorize().await;
    follow.abort();
    pb.finish_and_clear();

    match result {
        Ok(credential) => success!(
            "Authentication successful! Access token valid until {}.",
            credential.expires_at().format("%Y-%m-%d %H:%M:%S UTC")
        ),
        Err(e) => error!("Authentication failed. Err: {}", describe(&e)),
    }
}
