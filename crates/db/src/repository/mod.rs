//! Watchlist repository — one method per data-access operation.
//!
//! Every method returns a `Result<T, DbError>`. Authorization is the
//! caller's job: `exists` answers the ownership question, nothing here
//! enforces it.

use async_trait::async_trait;

use crate::{
    DbError,
    models::{Stock, StockId, UserId, Watchlist, WatchlistId},
};

pub(crate) mod bulk;
pub mod memory;
pub mod watchlists;

pub use memory::MemoryWatchlistStore;
pub use watchlists::WatchlistStore;

/// The contract every watchlist store must fulfil.
///
/// Each write is all-or-nothing: either every statement lands or none does.
#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    /// Watchlists owned by `user_id` that have at least one stock.
    ///
    /// Empty watchlists are absent because the lookup is an inner join. Order
    /// is unspecified.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Watchlist>, DbError>;

    /// Every stock on any of the user's watchlists, once per id.
    async fn list_distinct_stocks_by_user(&self, user_id: UserId) -> Result<Vec<Stock>, DbError>;

    /// Whether `watchlist_id` exists and belongs to `user_id`.
    async fn exists(&self, watchlist_id: WatchlistId, user_id: UserId) -> Result<bool, DbError>;

    /// A single watchlist. An empty watchlist comes back with `stocks: []`.
    ///
    /// Fails with [`DbError::NotFound`] when no watchlist has this id.
    async fn get_by_id(&self, watchlist_id: WatchlistId) -> Result<Watchlist, DbError>;

    /// Insert a watchlist and its memberships, returning the new id.
    async fn create(
        &self,
        user_id: UserId,
        name: &str,
        stock_ids: &[StockId],
    ) -> Result<WatchlistId, DbError>;

    /// Rename the watchlist and replace its memberships with `stock_ids`.
    ///
    /// No existence check: an unknown id with no stocks is a no-op.
    async fn update(
        &self,
        watchlist_id: WatchlistId,
        name: &str,
        stock_ids: &[StockId],
    ) -> Result<(), DbError>;

    /// Remove the watchlist and its memberships. Unknown ids are a no-op.
    async fn delete(&self, watchlist_id: WatchlistId) -> Result<(), DbError>;
}
