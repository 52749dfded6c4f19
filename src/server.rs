use std::{net::SocketAddr, time::Duration};

use axum::{Extension, Router, routing::get};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};
use url::Url;

use crate::{api, error::AuthError, types::CallbackResponse};

/// How long a graceful shutdown may take before the server task is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// One-shot local HTTP endpoint for the redirect uri.
///
/// The socket is bound by [`CallbackListener::bind`], before the authorization
/// link is handed out, and released when [`CallbackListener::wait_for_code`]
/// returns. If the listener is dropped without waiting (for example because
/// the surrounding future was cancelled) the server task is aborted.
pub struct CallbackListener {
    local_addr: SocketAddr,
    responses: mpsc::Receiver<CallbackResponse>,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<std::io::Result<()>>>,
}

impl CallbackListener {
    /// Binds the host and port of `redirect_uri` and starts serving its path.
    pub async fn bind(redirect_uri: &Url) -> Result<Self, AuthError> {
        let host = redirect_uri.host_str().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "redirect uri has no host")
        })?;
        let port = redirect_uri.port_or_known_default().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "redirect uri has no port")
        })?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;

        let (slot, responses) = mpsc::channel::<CallbackResponse>(1);
        let (shutdown, shutdown_signal) = oneshot::channel::<()>();

        let app = Router::new()
            .route(redirect_uri.path(), get(api::callback))
            .layer(Extension(slot));

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_signal.await;
                })
                .await
        });

        debug!(%local_addr, path = redirect_uri.path(), "callback listener bound");

        Ok(CallbackListener {
            local_addr,
            responses,
            shutdown: Some(shutdown),
            server: Some(server),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the redirect and validates it against `expected_state`.
    ///
    /// Fails with [`AuthError::InvalidAuth`] when the provider reports an
    /// error or the state does not match, and with [`AuthError::AuthTimeout`]
    /// when nothing arrives within `timeout`. A server that stops before any
    /// redirect is an [`AuthError::Listener`]. The listener is shut down before
    /// this returns, whatever the outcome.
    pub async fn wait_for_code(
        mut self,
        expected_state: String,
        timeout: Duration,
    ) -> Result<String, AuthError> {
        let outcome = tokio::select! {
            received = self.responses.recv() => match received {
                Some(response) => validate(response, &expected_state),
                None => Err(AuthError::Listener(std::io::Error::other(
                    "callback listener stopped before a redirect arrived",
                ))),
            },
            _ = tokio::time::sleep(timeout) => Err(AuthError::AuthTimeout),
        };

        self.shutdown().await;
        outcome
    }

    async fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Some(mut server) = self.server.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => warn!("callback listener stopped with error: {}", e),
                Ok(Err(e)) => warn!("callback listener task failed: {}", e),
                Err(_) => {
                    server.abort();
                    let _ = server.await;
                }
            }
        }

        debug!(local_addr = %self.local_addr, "callback listener shut down");
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

fn validate(response: CallbackResponse, expected_state: &str) -> Result<String, AuthError> {
    if !response.error.is_empty() {
        debug!(error = %response.error, "provider reported an authorization error");
        return Err(AuthError::InvalidAuth);
    }
    if response.state != expected_state {
        debug!("callback state does not match this attempt");
        return Err(AuthError::InvalidAuth);
    }

    Ok(response.code)
}
