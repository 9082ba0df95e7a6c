//! App Core for Passdrop.
//!
//! Wires the SQLite store, the share lifecycle engine, the stats aggregator
//! and the settings engine together for the RPC front end.

use std::sync::Arc;

use tracing::{error, info};

use crate::database::connection::Database;
use crate::platform;
use crate::services::clock::{Clock, SystemClock};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::share_lifecycle::ShareLifecycle;
use crate::services::stats_aggregator::StatsAggregator;
use crate::storage::SqliteStore;

/// Central application struct.
pub struct App {
    pub db: Arc<Database>,
    pub store: Arc<SqliteStore>,
    pub lifecycle: ShareLifecycle,
    pub stats: StatsAggregator,
    pub settings_engine: SettingsEngine,
    pub clock: Arc<dyn Clock>,
}

impl App {
    /// Opens the database at `db_path` and loads settings from the default
    /// location (or `PASSDROP_CONFIG` when set).
    pub fn new(db_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_settings_engine(db_path, SettingsEngine::new(platform::config_file_override()))
    }

    /// Like [`App::new`] with an explicit settings engine.
    ///
    /// A missing settings file means defaults. A file that cannot be read,
    /// parsed or validated is an error.
    pub fn with_settings_engine(
        db_path: &str,
        mut settings_engine: SettingsEngine,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let settings = settings_engine.load().map_err(|e| {
            error!(path = settings_engine.get_config_path(), error = %e, "settings file rejected");
            e
        })?;

        let db = Arc::new(Database::open(db_path)?);
        let store = Arc::new(SqliteStore::new(db.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let lifecycle = ShareLifecycle::new(store.clone(), store.clone(), settings.share.clone())
            .with_clock(clock.clone());
        let stats = StatsAggregator::new(store.clone()).with_clock(clock.clone());

        info!(
            db_path,
            policy = ?settings.share.pre_view_policy,
            "passdrop initialized"
        );

        Ok(Self {
            db,
            store,
            lifecycle,
            stats,
            settings_engine,
            clock,
        })
    }

    /// Swaps the time source used by every component.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.lifecycle = self.lifecycle.with_clock(clock.clone());
        self.stats = self.stats.with_clock(clock.clone());
        self.clock = clock;
        self
    }
}
