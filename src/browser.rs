use std::io;

use crate::warning;

/// Hands the authorization link to the user.
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

impl<F> LinkOpener for F
where
    F: Fn(&str) -> io::Result<()> + Send + Sync,
{
    fn open(&self, url: &str) -> io::Result<()> {
        self(url)
    }
}

/// Opens links in the default browser, printing them when that fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct Browser;

impl LinkOpener for Browser {
    fn open(&self, url: &str) -> io::Result<()> {
        if webbrowser::open(url).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                url
            );
        }
        Ok(())
    }
}
