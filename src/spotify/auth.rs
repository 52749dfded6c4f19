use crate::{config::Settings, types::AuthorizationRequest, utils};

/// Builds the authorization link the user has to open to grant access.
///
/// A fresh state value is generated on every call and returned next to the
/// url; the callback listener must be given that same value. No network I/O
/// happens here.
///
/// # Example
///
/// ```
/// let verifier = utils::generate_code_verifier();
/// let challenge = utils::generate_code_challenge(&verifier);
/// let request = build_authorization(&settings, "abc123", &challenge);
/// webbrowser::open(&request.url)?;
/// ```
pub fn build_authorization(
    settings: &Settings,
    client_id: &str,
    code_challenge: &str,
) -> AuthorizationRequest {
    let state = utils::generate_state();
    let scope = settings.scopes.join(" ");

    let mut url = settings.authorize_url();
    url.query_pairs_mut()
        .clear()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", settings.redirect_uri.as_str())
        .append_pair("state", &state)
        .append_pair("scope", &scope)
        .append_pair("code_challenge_method", "S256")
        .append_pair("code_challenge", code_challenge);

    AuthorizationRequest {
        url: url.into(),
        state,
    }
}
