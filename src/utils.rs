use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

pub const CODE_VERIFIER_LENGTH: usize = 128;

pub fn generate_code_verifier() -> String {
    generate_code_verifier_with(&mut rand::rng())
}

/// Draws a verifier from the given generator, so callers can seed it.
pub fn generate_code_verifier_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(CODE_VERIFIER_LENGTH)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Per-attempt correlation value round-tripped through the redirect.
pub fn generate_state() -> String {
    rand::rng().random::<u64>().to_string()
}

/// Point in a token's lifetime at which it gets renewed: 5/6 of `expires_in`.
pub fn refresh_delay(expires_in: std::time::Duration) -> std::time::Duration {
    expires_in - expires_in / 6
}
