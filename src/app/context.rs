use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::app::error::Result;
use crate::config::Config;
use crate::pipeline::Orchestrator;
use crate::scraper::{ChromeDriverFactory, DriverFactory};
use crate::session::SessionStore;
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub session: SessionStore,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppContext {
    /// Open the configured database and wire Chrome-backed drivers
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.database_path()?;
        ensure_parent(&db_path)?;
        info!("Using database at {:?}", db_path);

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let session = SessionStore::new(config.cookies_path()?);
        let factory: Arc<dyn DriverFactory> = Arc::new(ChromeDriverFactory::new(
            config.browser.clone(),
            Some(session.clone()),
        ));

        Ok(Self::with_parts(config, store, session, factory))
    }

    pub fn in_memory(config: Config, factory: Arc<dyn DriverFactory>) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let session = SessionStore::new(config.cookies_path()?);
        Ok(Self::with_parts(config, store, session, factory))
    }

    fn with_parts(
        config: Config,
        store: Arc<SqliteStore>,
        session: SessionStore,
        factory: Arc<dyn DriverFactory>,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            store.clone(),
            factory,
            config.site.clone(),
            config.pipeline.clone(),
        )
        .with_session_refresh(config.session.refresh_after_scrape);

        Self {
            config,
            store,
            session,
            orchestrator: Arc::new(orchestrator),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
