//! Postgres-backed watchlist store.
//!
//! Reads go straight to the pool. Writes open one transaction per call; the
//! `sqlx::Transaction` guard rolls back on every early return and commit is
//! the only way out of the happy path.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::{
    config::{BulkInsertMode, StoreConfig},
    deadline::Deadline,
    error::{at, TxStep},
    models::{distinct_stocks, group_watchlists, Stock, StockId, UserId, Watchlist, WatchlistId, WatchlistStockRow},
    pool::{create_pool, DbPool},
    DbError,
};

use super::{bulk, WatchlistRepository};

const WATCHLISTS_BY_USER: &str = r#"
    SELECT wl.id AS watchlist_id, wl.name, s.id AS stock_id, s.symbol
    FROM watchlists wl
    INNER JOIN watchlist_stocks wls ON wl.id = wls.watchlist_id
    INNER JOIN stocks s ON wls.stock_id = s.id
    WHERE wl.user_id = $1
"#;

const WATCHLIST_EXISTS: &str =
    "SELECT EXISTS(SELECT 1 FROM watchlists WHERE id = $1 AND user_id = $2)";

const WATCHLIST_NAME: &str = "SELECT name FROM watchlists WHERE id = $1";

const WATCHLIST_STOCKS: &str = r#"
    SELECT s.id, s.symbol
    FROM watchlist_stocks wls
    INNER JOIN stocks s ON s.id = wls.stock_id
    WHERE wls.watchlist_id = $1
"#;

/// Watchlist store over a shared Postgres pool.
///
/// Cloning is cheap: the pool is reference-counted.
#[derive(Debug, Clone)]
pub struct WatchlistStore {
    pool: DbPool,
    bulk_insert: BulkInsertMode,
    call_timeout: Option<Duration>,
    deadline: Deadline,
}

impl WatchlistStore {
    /// Store over an existing pool with default settings.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            bulk_insert: BulkInsertMode::default(),
            call_timeout: None,
            deadline: Deadline::NONE,
        }
    }

    pub fn with_config(pool: DbPool, config: &StoreConfig) -> Self {
        Self {
            pool,
            bulk_insert: config.bulk_insert,
            call_timeout: config.call_timeout,
            deadline: Deadline::NONE,
        }
    }

    /// Open a pool from `config` and wrap it.
    pub async fn connect(config: &StoreConfig) -> Result<Self, DbError> {
        let pool = create_pool(config).await?;
        Ok(Self::with_config(pool, config))
    }

    /// A clone of this store whose calls must finish by `deadline`.
    ///
    /// Calls that run out of time fail with [`DbError::DeadlineExceeded`] and
    /// roll back whatever they had written.
    pub fn with_deadline(&self, deadline: Deadline) -> Self {
        Self {
            deadline,
            ..self.clone()
        }
    }

    fn deadline(&self) -> Deadline {
        self.deadline.min(Deadline::from_timeout(self.call_timeout))
    }

    async fn fetch_by_user(&self, user_id: UserId) -> Result<Vec<Watchlist>, DbError> {
        let rows = sqlx::query_as::<_, WatchlistStockRow>(WATCHLISTS_BY_USER)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        debug!(user_id, rows = rows.len(), "fetched watchlist rows");
        Ok(group_watchlists(rows))
    }

    async fn fetch_exists(&self, watchlist_id: WatchlistId, user_id: UserId) -> Result<bool, DbError> {
        let exists = sqlx::query_scalar::<_, bool>(WATCHLIST_EXISTS)
            .bind(watchlist_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn fetch_by_id(&self, watchlist_id: WatchlistId) -> Result<Watchlist, DbError> {
        let name = sqlx::query_scalar::<_, String>(WATCHLIST_NAME)
            .bind(watchlist_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound { resource: "watchlist", id: watchlist_id })?;

        let stocks = sqlx::query_as::<_, Stock>(WATCHLIST_STOCKS)
            .bind(watchlist_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(Watchlist { id: watchlist_id, name, stocks })
    }

    async fn insert(
        &self,
        user_id: UserId,
        name: &str,
        stock_ids: &[StockId],
    ) -> Result<WatchlistId, DbError> {
        let mut tx = self.pool.begin().await.map_err(at(TxStep::Begin))?;

        let watchlist_id = sqlx::query_scalar::<_, WatchlistId>(
            "INSERT INTO watchlists (user_id, name) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(at(TxStep::InsertWatchlist))?;

        if !stock_ids.is_empty() {
            bulk::insert_memberships(&mut *tx, self.bulk_insert, watchlist_id, stock_ids)
                .await
                .map_err(at(TxStep::InsertMemberships))?;
        }

        tx.commit().await.map_err(at(TxStep::Commit))?;
        Ok(watchlist_id)
    }

    async fn replace(
        &self,
        watchlist_id: WatchlistId,
        name: &str,
        stock_ids: &[StockId],
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await.map_err(at(TxStep::Begin))?;

        let renamed = sqlx::query("UPDATE watchlists SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(watchlist_id)
            .execute(&mut *tx)
            .await
            .map_err(at(TxStep::RenameWatchlist))?
            .rows_affected();

        let cleared = sqlx::query("DELETE FROM watchlist_stocks WHERE watchlist_id = $1")
            .bind(watchlist_id)
            .execute(&mut *tx)
            .await
            .map_err(at(TxStep::ClearMemberships))?
            .rows_affected();
        debug!(watchlist_id, renamed, cleared, "previous memberships cleared");

        if !stock_ids.is_empty() {
            bulk::insert_memberships(&mut *tx, self.bulk_insert, watchlist_id, stock_ids)
                .await
                .map_err(at(TxStep::InsertMemberships))?;
        }

        tx.commit().await.map_err(at(TxStep::Commit))?;
        Ok(())
    }

    async fn remove(&self, watchlist_id: WatchlistId) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await.map_err(at(TxStep::Begin))?;

        sqlx::query("DELETE FROM watchlist_stocks WHERE watchlist_id = $1")
            .bind(watchlist_id)
            .execute(&mut *tx)
            .await
            .map_err(at(TxStep::ClearMemberships))?;

        let deleted = sqlx::query("DELETE FROM watchlists WHERE id = $1")
            .bind(watchlist_id)
            .execute(&mut *tx)
            .await
            .map_err(at(TxStep::DeleteWatchlist))?
            .rows_affected();

        tx.commit().await.map_err(at(TxStep::Commit))?;
        debug!(watchlist_id, deleted, "watchlist deleted");
        Ok(())
    }
}

#[async_trait]
impl WatchlistRepository for WatchlistStore {
    #[instrument(skip(self), err)]
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Watchlist>, DbError> {
        self.deadline().run(self.fetch_by_user(user_id)).await
    }

    #[instrument(skip(self), err)]
    async fn list_distinct_stocks_by_user(&self, user_id: UserId) -> Result<Vec<Stock>, DbError> {
        let watchlists = self.deadline().run(self.fetch_by_user(user_id)).await?;
        Ok(distinct_stocks(&watchlists))
    }

    #[instrument(skip(self), err)]
    async fn exists(&self, watchlist_id: WatchlistId, user_id: UserId) -> Result<bool, DbError> {
        self.deadline().run(self.fetch_exists(watchlist_id, user_id)).await
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&self, watchlist_id: WatchlistId) -> Result<Watchlist, DbError> {
        self.deadline().run(self.fetch_by_id(watchlist_id)).await
    }

    #[instrument(skip(self, stock_ids), fields(stocks = stock_ids.len()), err)]
    async fn create(
        &self,
        user_id: UserId,
        name: &str,
        stock_ids: &[StockId],
    ) -> Result<WatchlistId, DbError> {
        self.deadline().run(self.insert(user_id, name, stock_ids)).await
    }

    #[instrument(skip(self, stock_ids), fields(stocks = stock_ids.len()), err)]
    async fn update(
        &self,
        watchlist_id: WatchlistId,
        name: &str,
        stock_ids: &[StockId],
    ) -> Result<(), DbError> {
        self.deadline().run(self.replace(watchlist_id, name, stock_ids)).await
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, watchlist_id: WatchlistId) -> Result<(), DbError> {
        self.deadline().run(self.remove(watchlist_id)).await
    }
}
