use crate::{
    cli::{describe, session},
    error, success,
};

pub async fn refresh() {
    let session = session();

    match session.refresh().await {
        Ok(credential) => success!(
            "Token refreshed, valid until {}.",
            credential.expires_at().format("%Y-%m-%d %H:%M:%S UTC")
        ),
        Err(e) => error!("Token refresh failed. Err: {}", describe(&e)),
    }
}
