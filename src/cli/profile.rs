use tabled::Table;

use crate::{
    cli::{describe, session},
    error,
    spotify::client::ApiClient,
    types::ProfileTableRow,
};

pub async fn profile() {
    let session = session();

    let credential = match session.authenticate().await {
        Ok(c) => c,
        Err(e) => error!("Authentication failed. Err: {}", describe(&e)),
    };

    let client = ApiClient::new(session.settings(), credential.access_token);
    match client.user_profile().await {
        Ok(profile) => {
            let rows = vec![ProfileTableRow {
                name: profile.name.unwrap_or_else(|| "-".to_string()),
                followers: profile.followers.total,
            }];
            println!("{}", Table::new(rows));
        }
        Err(e) => error!("Failed to fetch profile. Err: {}", e),
    }
}
