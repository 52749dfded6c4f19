use crate::{
    cli::{describe, session},
    error, info, utils,
};

pub async fn watch() {
    let session = session();

    let result = session
        .run(|credential| {
            info!(
                "New access token, valid until {}. Next refresh in {}s.",
                credential.expires_at().format("%Y-%m-%d %H:%M:%S UTC"),
                utils::refresh_delay(credential.expires_in).as_secs()
            )
        })
        .await;

    if let Err(e) = result {
        error!("Lost authorization. Err: {}", describe(&e));
    }
}
