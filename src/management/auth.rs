use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::{
    browser::LinkOpener,
    config::Settings,
    error::AuthError,
    management::CredentialStore,
    server::CallbackListener,
    spotify::{auth::build_authorization, token::TokenClient},
    types::{Credential, FlowState},
    utils,
};

/// Owns the current credential and drives the authorization flow.
///
/// ```text
/// Idle -> AwaitingConsent -> ExchangingCode -> Authenticated
/// Authenticated -> RefreshScheduled -> Refreshing -> Authenticated
/// Refreshing -> AwaitingConsent        (refresh grant refused)
/// any -> Failed
/// ```
///
/// Every token operation runs while holding the credential lock, so a manual
/// re-authorization and a scheduled refresh can never be in flight together.
/// State changes are published on a watch channel, see [`Session::subscribe`].
pub struct Session<S, O> {
    settings: Settings,
    tokens: TokenClient,
    store: S,
    opener: O,
    credential: Mutex<Option<Credential>>,
    state: watch::Sender<FlowState>,
}

impl<S, O> Session<S, O>
where
    S: CredentialStore,
    O: LinkOpener,
{
    pub fn new(settings: Settings, store: S, opener: O) -> Self {
        let tokens = TokenClient::new(&settings);
        Self::with_token_client(settings, tokens, store, opener)
    }

    pub fn with_token_client(settings: Settings, tokens: TokenClient, store: S, opener: O) -> Self {
        let (state, _) = watch::channel(FlowState::Idle);
        Session {
            settings,
            tokens,
            store,
            opener,
            credential: Mutex::new(None),
            state,
        }
    }

    pub fn state(&self) -> FlowState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state.subscribe()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn credential(&self) -> Option<Credential> {
        self.credential.lock().await.clone()
    }

    /// Bearer token for downstream API calls, if authenticated.
    pub async fn access_token(&self) -> Option<String> {
        self.credential
            .lock()
            .await
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    /// Client id from the settings, falling back to the store.
    pub async fn client_id(&self) -> Result<String, AuthError> {
        if let Some(id) = &self.settings.client_id {
            return Ok(id.clone());
        }

        let stored = self.store.load().await?;
        if stored.client_id.trim().is_empty() {
            return Err(AuthError::MissingClientId);
        }
        Ok(stored.client_id)
    }

    /// Runs a brand-new interactive authorization, replacing any credential.
    pub async fn authorize(&self) -> Result<Credential, AuthError> {
        let mut slot = self.credential.lock().await;
        self.authorize_locked(&mut slot).await
    }

    /// Performs a single refresh grant without any fallback.
    pub async fn refresh(&self) -> Result<Credential, AuthError> {
        let mut slot = self.credential.lock().await;
        let result = self.refresh_locked(&mut slot).await;
        if result.is_err() {
            self.transition(FlowState::Failed);
        }
        result
    }

    /// Gets a fresh credential: refresh grant when a refresh token is known,
    /// interactive authorization when there is none or the grant is refused.
    /// Configuration and store failures end the attempt instead.
    pub async fn authenticate(&self) -> Result<Credential, AuthError> {
        let mut slot = self.credential.lock().await;
        match self.refresh_locked(&mut slot).await {
            Ok(credential) => Ok(credential),
            Err(
                e @ (AuthError::NoRefreshToken
                | AuthError::TokenRequestFailed(_)
                | AuthError::TokenInvalidResponse(_)),
            ) => {
                warn!("refresh not possible ({}), starting a new authorization", e);
                self.authorize_locked(&mut slot).await
            }
            Err(e) => {
                self.transition(FlowState::Failed);
                Err(e)
            }
        }
    }

    /// Keeps the credential fresh for as long as the returned future is polled.
    ///
    /// `on_credential` sees every credential obtained, the first one included.
    /// Only returns when the flow ends up in [`FlowState::Failed`].
    pub async fn run<F>(&self, mut on_credential: F) -> Result<(), AuthError>
    where
        F: FnMut(&Credential) + Send,
    {
        let mut credential = self.authenticate().await?;
        loop {
            on_credential(&credential);

            let delay = utils::refresh_delay(credential.expires_in);
            self.transition(FlowState::RefreshScheduled);
            info!(delay_secs = delay.as_secs_f64(), "token refresh scheduled");
            tokio::time::sleep(delay).await;

            credential = self.authenticate().await?;
        }
    }

    async fn authorize_locked(
        &self,
        slot: &mut Option<Credential>,
    ) -> Result<Credential, AuthError> {
        let result = self.interactive(slot).await;
        if result.is_err() {
            self.transition(FlowState::Failed);
        }
        result
    }

    async fn interactive(&self, slot: &mut Option<Credential>) -> Result<Credential, AuthError> {
        let client_id = self.client_id().await?;
        self.transition(FlowState::AwaitingConsent);

        let verifier = utils::generate_code_verifier();
        let challenge = utils::generate_code_challenge(&verifier);
        let request = build_authorization(&self.settings, &client_id, &challenge);

        // bound before the link leaves the process, so no redirect can be lost
        let listener = CallbackListener::bind(&self.settings.redirect_uri).await?;

        if let Err(e) = self.opener.open(&request.url) {
            warn!("failed to open authorization link ({}): {}", e, request.url);
        }

        let code = listener
            .wait_for_code(request.state, self.settings.callback_timeout)
            .await?;

        self.transition(FlowState::ExchangingCode);
        let credential = self.tokens.exchange_code(&client_id, &verifier, &code).await?;

        self.keep(slot, credential).await
    }

    async fn refresh_locked(&self, slot: &mut Option<Credential>) -> Result<Credential, AuthError> {
        let client_id = self.client_id().await?;

        let refresh_token = match slot.as_ref() {
            Some(credential) => credential.refresh_token.clone(),
            None => self.store.load().await?.refresh_token,
        };
        if refresh_token.is_empty() {
            return Err(AuthError::NoRefreshToken);
        }

        self.transition(FlowState::Refreshing);
        let credential = self.tokens.refresh(&client_id, &refresh_token).await?;

        // the provider may have rotated it
        self.keep(slot, credential).await
    }

    /// Installs a newly granted credential, then persists its refresh token.
    ///
    /// The slot is updated first: after a rotation the previous refresh token
    /// may already be revoked, so it must not be presented again even when
    /// the store cannot be written.
    async fn keep(
        &self,
        slot: &mut Option<Credential>,
        credential: Credential,
    ) -> Result<Credential, AuthError> {
        *slot = Some(credential.clone());
        self.store.save_refresh_token(&credential.refresh_token).await?;
        self.transition(FlowState::Authenticated);

        Ok(credential)
    }

    fn transition(&self, to: FlowState) {
        let from = self.state.send_replace(to);
        if from != to {
            debug!(%from, %to, "flow state changed");
        }
    }
}
