//! Interactive, operator-supervised session capture.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::app::{HoundError, Result};
use crate::scraper::{selectors, Driver, Page};
use crate::session::SessionStore;

/// Greeting shown in the account menu once signed in
pub const LOGGED_IN_MARKER: &str = "Hello,";

/// Asks the operator something and returns the answer.
#[async_trait]
pub trait Prompt: Send + Sync {
    async fn ask(&self, message: &str) -> Result<String>;
}

/// Prompt on the process terminal
pub struct StdinPrompt;

#[async_trait]
impl Prompt for StdinPrompt {
    async fn ask(&self, message: &str) -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{} ", message)?;
        stdout.flush()?;

        read_blocking(|| {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
    }
}

/// Run a blocking read on the blocking pool and trim the answer.
async fn read_blocking<F>(read: F) -> Result<String>
where
    F: FnOnce() -> io::Result<String> + Send + 'static,
{
    let line = tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| HoundError::Other(format!("prompt task failed: {}", e)))??;
    Ok(line.trim().to_string())
}

pub async fn is_logged_in(page: &dyn Page) -> Result<bool> {
    Ok(page
        .text_first(selectors::ACCOUNT_GREETING)
        .await?
        .is_some_and(|text| text.contains(LOGGED_IN_MARKER)))
}

/// Open the site, let the operator sign in, then save the cookies.
///
/// Cookies are saved even when the marker is missing, so a partial session
/// can still be inspected; the return value says whether login was confirmed.
pub async fn capture_session(
    driver: &Driver,
    store: &SessionStore,
    prompt: &dyn Prompt,
    home_url: &str,
    timeout: Duration,
) -> Result<bool> {
    driver.goto(home_url, timeout).await?;

    prompt
        .ask("Log in in the browser window, then press Enter to continue...")
        .await?;

    let logged_in = is_logged_in(driver.page()).await?;
    if logged_in {
        info!("Login confirmed");
    } else {
        warn!("Login marker not found; saving cookies anyway");
    }

    let cookies = driver.page().cookies().await?;
    if cookies.is_empty() {
        return Err(HoundError::Browser("browser returned no cookies".to_string()));
    }
    store.save(&cookies)?;

    Ok(logged_in)
}
