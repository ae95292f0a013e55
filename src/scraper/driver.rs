use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::scraper::{Humanizer, NoopHumanizer, Page};
use crate::session::SessionStore;

/// One browsing context handed to the pipeline.
pub struct Driver {
    id: usize,
    page: Box<dyn Page>,
    humanizer: Arc<dyn Humanizer>,
    humanized: AtomicBool,
    session: Option<SessionStore>,
}

impl Driver {
    pub fn new(id: usize, page: Box<dyn Page>) -> Self {
        Self {
            id,
            page,
            humanizer: Arc::new(NoopHumanizer),
            humanized: AtomicBool::new(false),
            session: None,
        }
    }

    pub fn with_humanizer(mut self, humanizer: Arc<dyn Humanizer>) -> Self {
        self.humanizer = humanizer;
        self
    }

    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    /// Navigate; the first successful navigation also runs the humanizer.
    pub async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        self.page.goto(url, timeout).await?;

        if !self.humanized.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.humanizer.humanize(self.page.as_ref()).await {
                debug!("Driver {}: humanizing failed: {}", self.id, e);
            }
        }
        Ok(())
    }

    /// Write the page's current cookies back to the session file.
    ///
    /// Returns 0 when the driver has no session attached.
    pub async fn save_session(&self) -> Result<usize> {
        let Some(ref session) = self.session else {
            return Ok(0);
        };

        let cookies = self.page.cookies().await?;
        if cookies.is_empty() {
            debug!("Driver {}: no cookies to save", self.id);
            return Ok(0);
        }
        session.save(&cookies)
    }

    /// Best-effort session refresh; failures are logged only
    pub async fn refresh_session(&self) {
        if let Err(e) = self.save_session().await {
            warn!("Driver {}: failed to save session: {}", self.id, e);
        }
    }

    pub async fn close(&self) -> Result<()> {
        self.page.close().await?;
        info!("Driver {} closed", self.id);
        Ok(())
    }
}

/// Source of fresh, isolated drivers.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn acquire(&self) -> Result<Driver>;
}
