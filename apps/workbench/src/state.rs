//! # Workbench State
//!
//! The database pool, the reconciler built over it and the loaded
//! configuration. Every command borrows it; nothing in it needs locking
//! since `SqlitePool` is shared safely between tasks.

use tracing::info;

use crate::config::WorkbenchConfig;
use atelier_core::User;
use atelier_db::{Database, DbResult, Reconciler};

use crate::session::Session;

#[derive(Debug, Clone)]
pub struct Workbench {
    db: Database,
    reconciler: Reconciler,
    config: WorkbenchConfig,
}

impl Workbench {
    /// Connects to the configured database and runs migrations.
    pub async fn open(config: WorkbenchConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening workbench database");
        let db = Database::new(config.db_config()).await?;
        Ok(Workbench::new(db, config))
    }

    pub fn new(db: Database, config: WorkbenchConfig) -> Self {
        let reconciler = db.reconciler(config.reconciler_config());
        Workbench {
            db,
            reconciler,
            config,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    /// Session for requests that do not name a user.
    pub fn default_session(&self) -> Session {
        Session::new(User {
            id: "workbench".to_string(),
            full_name: self.config.user_name.clone(),
            role: self.config.user_role,
        })
    }
}
