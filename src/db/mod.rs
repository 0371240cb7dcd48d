use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::sql::Dialect;
use crate::util::env::{Backend, Config};

pub mod models;
pub mod sql;
pub mod supabase;

pub mod prelude {
    pub use crate::db::models::{
        Match, MatchChanges, MatchFields, MatchPayload, MatchStatus, ValidationError,
    };
    pub use crate::db::{MatchStore, StoreError, StoreResult, open_store};
}

use models::{Match, MatchChanges, MatchFields};

/// Queries shared by the SQL backends. `$n` placeholders are understood by both drivers.
pub mod sql_fragment {
    pub const LIST_MATCHES: &str = r#"
        SELECT id, date, time, club, team, result, status
        FROM matches
        ORDER BY date DESC, id DESC
    "#;

    pub const INSERT_MATCH: &str = r#"
        INSERT INTO matches (date, time, club, team, result, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, date, time, club, team, result, status
    "#;

    /// `$5`/`$7` flag whether `time`/`result` were sent; a null `$9` keeps the status.
    pub const UPDATE_MATCH: &str = r#"
        UPDATE matches
        SET date = $2,
            club = $3,
            team = $4,
            time = CASE WHEN $5 THEN $6 ELSE time END,
            result = CASE WHEN $7 THEN $8 ELSE result END,
            status = COALESCE($9, status)
        WHERE id = $1
        RETURNING id, date, time, club, team, result, status
    "#;

    pub const DELETE_MATCH: &str = "DELETE FROM matches WHERE id = $1";
}

/// Persistence for match records.
///
/// Implementations only enforce column presence; input validation happens in the API layer.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Every record, newest date first (ties: highest id first).
    async fn list_all(&self) -> StoreResult<Vec<Match>>;

    /// Inserts a record and returns it with its assigned id.
    async fn insert(&self, fields: MatchFields) -> StoreResult<Match>;

    /// Writes the required fields and whichever optional ones were sent; `Ok(None)` when no row
    /// has that id.
    async fn update(&self, id: i64, changes: MatchChanges) -> StoreResult<Option<Match>>;

    /// `Ok(false)` when no row has that id.
    async fn delete(&self, id: i64) -> StoreResult<bool>;
}

/// Opens the backend selected by `STORE_BACKEND`, running migrations for the SQL ones.
pub async fn open_store(config: &Config) -> StoreResult<Arc<dyn MatchStore>> {
    let store: Arc<dyn MatchStore> = match config.store_backend {
        Backend::Sqlite => {
            Arc::new(sql::SqlStore::connect(&config.database_url, Dialect::Sqlite).await?)
        }
        Backend::Postgres => {
            Arc::new(sql::SqlStore::connect(&config.database_url, Dialect::Postgres).await?)
        }
        Backend::Supabase => {
            let url = config
                .supabase_url
                .as_deref()
                .ok_or(StoreError::MissingSetting("SUPABASE_URL"))?;
            let key = config
                .supabase_anon_key
                .as_deref()
                .ok_or(StoreError::MissingSetting("SUPABASE_ANON_KEY"))?;

            Arc::new(supabase::SupabaseStore::new(url, key)?)
        }
    };

    tracing::info!(backend = ?config.store_backend, "record store ready");
    Ok(store)
}

pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),

    #[error(transparent)]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error("remote store answered {status}: {body}")]
    Remote { status: http::StatusCode, body: String },

    #[error("remote store returned no row for a write")]
    EmptyRepresentation,

    #[error("unknown match status '{0}'")]
    InvalidStatus(String),

    #[error("{0} must be set for this store backend")]
    MissingSetting(&'static str),

    #[error("{0} is not usable as a header value")]
    InvalidSetting(&'static str),
}
