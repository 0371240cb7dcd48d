use async_trait::async_trait;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use sqlx::migrate::Migrator;
use tracing::instrument;

use crate::db::models::{Match, MatchChanges, MatchFields, MatchRow};
use crate::db::{MatchStore, StoreResult, sql_fragment};

/// Which schema the connected database gets. Everything past migrations is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    fn migrator(self) -> Migrator {
        match self {
            Dialect::Sqlite => sqlx::migrate!("./migrations/sqlite"),
            Dialect::Postgres => sqlx::migrate!("./migrations/postgres"),
        }
    }
}

/// Store over an sqlx pool: an embedded SQLite file or a (typically managed) Postgres database.
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    /// Connects to `url` and applies pending migrations.
    ///
    /// SQLite files are only created when the URL asks for it (`?mode=rwc`).
    #[instrument(skip(url))]
    pub async fn connect(url: &str, dialect: Dialect) -> StoreResult<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().connect(url).await?;

        Self::from_pool(pool, dialect).await
    }

    pub async fn from_pool(pool: AnyPool, dialect: Dialect) -> StoreResult<Self> {
        dialect.migrator().run(&pool).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database. A single long-lived connection keeps the data alive.
    #[cfg(test)]
    pub async fn in_memory() -> StoreResult<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool, Dialect::Sqlite).await
    }

    #[cfg(test)]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl MatchStore for SqlStore {
    #[instrument(skip(self))]
    async fn list_all(&self) -> StoreResult<Vec<Match>> {
        let rows = sqlx::query_as::<_, MatchRow>(sql_fragment::LIST_MATCHES)
            .fetch_all(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "failure during match listing"))?;

        rows.into_iter().map(Match::try_from).collect()
    }

    #[instrument(skip(self, fields), fields(date = %fields.date))]
    async fn insert(&self, fields: MatchFields) -> StoreResult<Match> {
        let row = sqlx::query_as::<_, MatchRow>(sql_fragment::INSERT_MATCH)
            .bind(fields.date)
            .bind(fields.time)
            .bind(fields.club)
            .bind(fields.team)
            .bind(fields.result)
            .bind(fields.status.as_str())
            .fetch_one(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "failure during match insertion"))?;

        tracing::debug!(id = row.id, "inserted match");
        Match::try_from(row)
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: i64, changes: MatchChanges) -> StoreResult<Option<Match>> {
        let row = sqlx::query_as::<_, MatchRow>(sql_fragment::UPDATE_MATCH)
            .bind(id)
            .bind(changes.date)
            .bind(changes.club)
            .bind(changes.team)
            .bind(changes.time.is_some())
            .bind(changes.time.flatten())
            .bind(changes.result.is_some())
            .bind(changes.result.flatten())
            .bind(changes.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "failure during match update"))?;

        row.map(Match::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query(sql_fragment::DELETE_MATCH)
            .bind(id)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "failure during match deletion"))?;

        Ok(result.rows_affected() > 0)
    }
}
