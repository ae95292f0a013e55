use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, SetUserAgentOverrideParams, TimeSinceEpoch,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::layout::Point;
use chromiumoxide::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::{HoundError, Result};
use crate::domain::RawReview;
use crate::scraper::{
    DomExtractor, Driver, DriverConfig, DriverFactory, Fingerprint, Humanizer, NoopHumanizer,
    Page, PointerHumanizer,
};
use crate::session::{SameSite, SessionCookie, SessionStore};

/// One tab in a dedicated Chrome process.
pub struct ChromePage {
    browser: Mutex<Browser>,
    page: CdpPage,
    handler: JoinHandle<()>,
    poll: Duration,
    // Declared after `browser` so the process is killed before the directory goes
    profile: ProfileDir,
}

impl ChromePage {
    /// Launch a browser wearing `fingerprint` and open a blank tab
    pub async fn launch(id: usize, config: &DriverConfig, fingerprint: &Fingerprint) -> Result<Self> {
        let profile = ProfileDir::new(id);

        let mut builder = BrowserConfig::builder()
            .viewport(Viewport {
                width: fingerprint.width,
                height: fingerprint.height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .window_size(fingerprint.width, fingerprint.height)
            .user_data_dir(profile.path());

        for arg in launch_args(config) {
            builder = builder.arg(arg);
        }

        if let Some(ref exe) = config.chrome_executable {
            builder = builder.chrome_executable(exe);
        }

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| HoundError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            HoundError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let user_agent = user_agent_override(&fingerprint.user_agent, &config.locale);
        let page = match open_tab(&browser, user_agent).await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler.abort();
                return Err(e);
            }
        };

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            poll: config.selector_poll(),
            profile,
        })
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| HoundError::Browser(format!("Script execution failed: {}", e)))?
            .into_value()
            .map_err(|e| HoundError::Browser(format!("Failed to parse result: {:?}", e)))
    }
}

async fn open_tab(browser: &Browser, user_agent: SetUserAgentOverrideParams) -> Result<CdpPage> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| HoundError::Browser(format!("Failed to create page: {}", e)))?;

    page.execute(user_agent)
        .await
        .map_err(|e| HoundError::Browser(format!("Failed to set user agent: {}", e)))?;

    Ok(page)
}

/// Switches for every browser, then the configured extras
fn launch_args(config: &DriverConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "--no-sandbox",
        "--disable-gpu",
        "--disable-dev-shm-usage",
        "--disable-software-rasterizer",
        "--disable-blink-features=AutomationControlled",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("--lang={}", config.locale));
    args.extend(config.chrome_args.iter().cloned());
    args
}

fn user_agent_override(user_agent: &str, locale: &str) -> SetUserAgentOverrideParams {
    let mut params = SetUserAgentOverrideParams::new(user_agent.to_string());
    params.accept_language = Some(locale.to_string());
    params
}

/// Temporary browser profile, removed on close or when dropped.
///
/// Concurrent browsers must not share a profile directory.
struct ProfileDir(PathBuf);

impl ProfileDir {
    fn new(id: usize) -> Self {
        Self(std::env::temp_dir().join(format!("reviewhound-{}-{}", std::process::id(), id)))
    }

    fn path(&self) -> &Path {
        &self.0
    }

    fn remove(&self) {
        if !self.0.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            debug!("Could not remove {:?}: {}", self.0, e);
        }
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        self.remove();
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(HoundError::Browser(format!("Navigation to {} failed: {}", url, e))),
            Err(_) => Err(HoundError::timeout(format!("navigation to {}", url), timeout)),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Ok(Ok(_)) = tokio::time::timeout(remaining, self.page.find_element(selector)).await
            {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HoundError::timeout(selector, timeout));
            }
            tokio::time::sleep(self.poll.min(remaining)).await;
        }
    }

    async fn attribute_all(&self, selector: &str, attribute: &str) -> Result<Vec<String>> {
        self.eval(DomExtractor::attribute_all_script(selector, attribute))
            .await
    }

    async fn text_first(&self, selector: &str) -> Result<Option<String>> {
        let found: Vec<String> = self.eval(DomExtractor::text_first_script(selector)).await?;
        Ok(found.into_iter().next())
    }

    async fn text_all(&self, selector: &str) -> Result<Vec<String>> {
        self.eval(DomExtractor::text_all_script(selector)).await
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.eval(DomExtractor::exists_script(selector)).await
    }

    async fn review_elements(&self) -> Result<Vec<RawReview>> {
        self.eval(DomExtractor::review_elements_script()).await
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| HoundError::Browser(format!("Failed to read cookies: {}", e)))?;
        Ok(cookies.into_iter().map(from_cdp_cookie).collect())
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<usize> {
        let mut params = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            match to_cookie_param(cookie) {
                Ok(param) => params.push(param),
                Err(e) => warn!("Skipping cookie {}: {}", cookie.name, e),
            }
        }

        let accepted = params.len();
        if accepted > 0 {
            self.page
                .set_cookies(params)
                .await
                .map_err(|e| HoundError::Browser(format!("Failed to set cookies: {}", e)))?;
        }
        Ok(accepted)
    }

    async fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        self.page
            .move_mouse(Point::new(x, y))
            .await
            .map_err(|e| HoundError::Browser(format!("Pointer move failed: {}", e)))?;
        Ok(())
    }

    async fn scroll_by(&self, dy: f64) -> Result<()> {
        let _: bool = self.eval(DomExtractor::scroll_script(dy)).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Browser wait failed: {}", e);
        }
        self.handler.abort();

        self.profile.remove();
        Ok(())
    }
}

fn to_cookie_param(cookie: &SessionCookie) -> std::result::Result<CookieParam, String> {
    if cookie.name.is_empty() || cookie.domain.is_empty() {
        return Err("missing name or domain".to_string());
    }

    let same_site = match cookie.same_site_policy().unwrap_or(SameSite::Lax) {
        SameSite::Strict => CookieSameSite::Strict,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::None => CookieSameSite::None,
    };

    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only)
        .same_site(same_site);

    if let (false, Some(expires)) = (cookie.is_session(), cookie.expires) {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }

    builder.build()
}

fn from_cdp_cookie(cookie: Cookie) -> SessionCookie {
    let mut out = SessionCookie::new(cookie.name, cookie.value, cookie.domain);
    out.path = cookie.path;
    out.expires = (!cookie.session).then_some(cookie.expires);
    out.http_only = cookie.http_only;
    out.secure = cookie.secure;
    out.same_site = cookie.same_site.map(|s| {
        match s {
            CookieSameSite::Strict => SameSite::Strict,
            CookieSameSite::Lax => SameSite::Lax,
            CookieSameSite::None => SameSite::None,
        }
        .as_str()
        .to_string()
    });
    out
}

/// Launches one Chrome process per driver, seeded with the captured session.
pub struct ChromeDriverFactory {
    config: DriverConfig,
    session: Option<SessionStore>,
    humanizer: Arc<dyn Humanizer>,
    next_id: AtomicUsize,
}

impl ChromeDriverFactory {
    pub fn new(config: DriverConfig, session: Option<SessionStore>) -> Self {
        let humanizer: Arc<dyn Humanizer> = if config.humanize {
            Arc::new(PointerHumanizer::new(&config))
        } else {
            Arc::new(NoopHumanizer)
        };

        Self {
            config,
            session,
            humanizer,
            next_id: AtomicUsize::new(0),
        }
    }

    /// Inject the session file into a fresh page. Never fails the acquisition.
    async fn seed_session(&self, id: usize, page: &ChromePage, session: &SessionStore) {
        if !session.exists() {
            warn!(
                "Driver {}: no session file at {:?}, proceeding unauthenticated",
                id,
                session.path()
            );
            return;
        }

        let state = match session.load() {
            Ok(state) => state,
            Err(e) => {
                warn!("Driver {}: failed to load session: {}", id, e);
                return;
            }
        };

        match page.set_cookies(&state.cookies).await {
            Ok(n) => info!("Driver {}: loaded {} of {} cookies", id, n, state.len()),
            Err(e) => warn!("Driver {}: failed to inject cookies: {}", id, e),
        }
    }
}

#[async_trait]
impl DriverFactory for ChromeDriverFactory {
    async fn acquire(&self) -> Result<Driver> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let fingerprint = Fingerprint::random(&self.config);
        info!(
            "Launching driver {} (Chrome/{}, {}x{})",
            id, fingerprint.chrome_major, fingerprint.width, fingerprint.height
        );

        let page = ChromePage::launch(id, &self.config, &fingerprint).await?;

        if let Some(ref session) = self.session {
            self.seed_session(id, &page, session).await;
        }

        let mut driver = Driver::new(id, Box::new(page)).with_humanizer(self.humanizer.clone());
        if let Some(ref session) = self.session {
            driver = driver.with_session(session.clone());
        }
        Ok(driver)
    }
}
