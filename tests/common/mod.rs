#![allow(dead_code)]

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use spotauth::{browser::LinkOpener, config::Settings};
use url::Url;

pub const CLIENT_ID: &str = "abc123";

pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

pub fn redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{}/callback", port)
}

/// Settings pointing the accounts and api services at `base`, with a fresh
/// local redirect port and a short consent window.
pub fn settings(base: &str) -> Settings {
    let mut settings = Settings::new(base, base, &redirect_uri(free_port())).unwrap();
    settings.client_id = Some(CLIENT_ID.to_string());
    settings.callback_timeout = Duration::from_secs(5);
    settings
}

pub fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub async fn hit_callback(port: u16, query: &[(&str, &str)]) -> reqwest::Response {
    reqwest::Client::new()
        .get(redirect_uri(port))
        .query(query)
        .send()
        .await
        .unwrap()
}

/// Plays the user and the provider: on "opening" the link it redirects to
/// the link's `redirect_uri` with a code and the link's state (or a forged
/// one).
#[derive(Clone)]
pub struct FakeProvider {
    pub code: &'static str,
    pub forged_state: Option<&'static str>,
    pub redirect: bool,
    opened: Arc<AtomicUsize>,
}

impl FakeProvider {
    pub fn consenting(code: &'static str) -> Self {
        FakeProvider {
            code,
            forged_state: None,
            redirect: true,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn forging(code: &'static str, state: &'static str) -> Self {
        FakeProvider {
            forged_state: Some(state),
            ..FakeProvider::consenting(code)
        }
    }

    pub fn silent() -> Self {
        FakeProvider {
            redirect: false,
            ..FakeProvider::consenting("")
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl LinkOpener for FakeProvider {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if !self.redirect {
            return Ok(());
        }

        let redirect = query_param(url, "redirect_uri").unwrap();
        let state = match self.forged_state {
            Some(forged) => forged.to_string(),
            None => query_param(url, "state").unwrap(),
        };
        let code = self.code;

        tokio::spawn(async move {
            let _ = reqwest::Client::new()
                .get(redirect)
                .query(&[("code", code), ("state", state.as_str())])
                .send()
                .await;
        });
        Ok(())
    }
}
