use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{Result, ViewdeckError};
use crate::classifier::{Classifier, HttpDimensionProbe};
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::hub::FeedHub;
use crate::store::SqliteStore;

pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub classifier: Arc<Classifier>,
    pub hub: FeedHub,
    pub config: Config,
}

impl AppContext {
    pub fn new(config_path: Option<PathBuf>, db_path: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load_from(&path),
            None => Config::load(),
        }
        .map_err(|e| ViewdeckError::Config(e.to_string()))?;

        let db_path = match db_path {
            Some(path) => path,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::with_defaults(
            &db_path,
            config.defaults.settings(),
        )?);
        Self::assemble(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::assemble(config, store)
    }

    fn assemble(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new());
        let probe = Arc::new(HttpDimensionProbe::new(fetcher.clone()));
        let classifier = Arc::new(Classifier::new(store.clone(), probe));
        let hub = FeedHub::new(
            store.clone(),
            fetcher.clone(),
            classifier.clone(),
            config.feed_url(),
            config.cache_ttl(),
        );

        Ok(Self {
            store,
            fetcher,
            classifier,
            hub,
            config,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| ViewdeckError::Config("Could not find data directory".into()))?;
        let viewdeck_dir = data_dir.join("viewdeck");
        std::fs::create_dir_all(&viewdeck_dir)?;
        Ok(viewdeck_dir.join("viewdeck.db"))
    }
}
