pub mod config;
pub mod coordination;
pub mod documents;
pub mod score;
pub mod variants;
pub mod watch;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use watchtower_core::{
    Config, KeyValueStore, LogNotifier, MemoryStore, ResearchEngine, RestStore, WatchtowerScheduler,
};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Options shared by every subcommand.
pub struct Context {
    /// Config file override; the default location otherwise.
    pub config_path: Option<PathBuf>,
    /// Keep everything in process memory instead of the REST store.
    pub memory: bool,
}

impl Context {
    pub fn config_path(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::default_path()?),
        }
    }

    pub fn load_config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        Ok(Config::load_from(&self.config_path()?)?.with_env_overrides())
    }

    pub fn store(&self, config: &Config) -> Result<Arc<dyn KeyValueStore>, Box<dyn std::error::Error>> {
        if self.memory {
            return Ok(Arc::new(MemoryStore::new()));
        }
        Ok(Arc::new(RestStore::from_config(&config.store)?))
    }

    pub fn engine(&self) -> Result<(Config, Arc<ResearchEngine>), Box<dyn std::error::Error>> {
        let config = self.load_config()?;
        let store = self.store(&config)?;
        let engine = ResearchEngine::from_config(&config, store)?;
        Ok((config, Arc::new(engine)))
    }

    pub fn scheduler(&self) -> Result<WatchtowerScheduler, Box<dyn std::error::Error>> {
        let (config, engine) = self.engine()?;
        Ok(WatchtowerScheduler::new(
            engine,
            Arc::new(LogNotifier),
            config.scheduler,
        ))
    }
}

/// Drive `fut` to completion on a fresh multi-thread runtime.
pub fn block_on<F, T>(fut: F) -> Result<T, Box<dyn std::error::Error>>
where
    F: Future<Output = Result<T, Box<dyn std::error::Error>>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(fut)
}
