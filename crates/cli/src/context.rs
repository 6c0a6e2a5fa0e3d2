//! Application context - wires the engine to an on-disk ledger

use std::path::{Path, PathBuf};
use std::sync::Arc;

use corebank_engine::{EngineConfig, TransactionEngine};
use corebank_ledger::{LedgerStore, SqliteLedgerStore};
use corebank_notify::{channel_catalog, FanoutRegistry, LogSubscriber, Outbox};

/// Application context
pub struct AppContext {
    pub engine: TransactionEngine,
    pub outbox: Arc<Outbox>,
    ledger_path: PathBuf,
}

impl AppContext {
    /// Open (or create) the ledger under `data_path`.
    ///
    /// `config_path` overrides the default engine configuration.
    pub fn new(
        data_path: impl AsRef<Path>,
        config_path: Option<&Path>,
    ) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref();
        std::fs::create_dir_all(data_path)?;
        let ledger_path = data_path.join("ledger.db");

        let config = match config_path {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };

        let store: Arc<dyn LedgerStore> = Arc::new(SqliteLedgerStore::new(&ledger_path)?);

        let outbox = Outbox::new();
        let fanout = Arc::new(FanoutRegistry::new().with_catalog(channel_catalog(&outbox)));
        fanout.attach_global(Arc::new(LogSubscriber));

        let engine = TransactionEngine::new(store, config)?.with_fanout(fanout);
        let restored = engine.restore()?;
        tracing::debug!(path = %ledger_path.display(), restored, "Ledger opened");

        Ok(Self {
            engine,
            outbox,
            ledger_path,
        })
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }
}
