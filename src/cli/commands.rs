use tracing::warn;

use crate::app::{AppContext, HoundError, Result};
use crate::scraper::{ChromeDriverFactory, DriverConfig, DriverFactory};
use crate::server::{self, AppState, ScrapeResponse};
use crate::session::login::{capture_session, StdinPrompt};

pub async fn serve(ctx: &AppContext, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut server = ctx.config.server.clone();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }

    if !ctx.session.exists() {
        warn!(
            "No session file at {:?}; run `reviewhound login` to scrape signed in",
            ctx.session.path()
        );
    }

    server::serve(AppState::new(ctx.orchestrator.clone()), &server.addr()).await
}

pub async fn scrape(ctx: &AppContext, keyword: &str, asin: &str) -> Result<()> {
    let corpus = ctx.orchestrator.scrape(keyword, asin).await?;
    let response = ScrapeResponse {
        success: true,
        corpus,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub async fn login(ctx: &AppContext) -> Result<()> {
    let config = DriverConfig {
        headless: false,
        humanize: false,
        ..ctx.config.browser.clone()
    };
    let driver = ChromeDriverFactory::new(config, None).acquire().await?;

    let result = capture_session(
        &driver,
        &ctx.session,
        &StdinPrompt,
        ctx.config.home_url(),
        ctx.config.pipeline.search_nav_timeout(),
    )
    .await;

    if let Err(e) = driver.close().await {
        warn!("Failed to close login browser: {}", e);
    }

    if result? {
        println!("Logged in. Session saved to {}", ctx.session.path().display());
    } else {
        println!(
            "Could not confirm login. Cookies saved to {} anyway",
            ctx.session.path().display()
        );
    }
    Ok(())
}

pub fn repair_session(ctx: &AppContext) -> Result<()> {
    if !ctx.session.exists() {
        return Err(HoundError::InvalidInput(format!(
            "no session file at {}",
            ctx.session.path().display()
        )));
    }

    let repaired = ctx.session.repair_file()?;
    if repaired == 0 {
        println!("All cookies already valid");
    } else {
        println!("Repaired {} cookies in {}", repaired, ctx.session.path().display());
    }
    Ok(())
}
