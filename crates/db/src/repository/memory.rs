//! `MemoryWatchlistStore` — an in-process stand-in for the Postgres store.
//!
//! Observable behaviour matches [`WatchlistStore`](super::WatchlistStore):
//! the same inner-join quirk in `list_by_user`, no dedup of memberships, and
//! foreign-key style rejection of memberships that point at unknown rows.
//! Each call holds the state lock for its whole duration, so writes are
//! atomic and concurrent writes serialize.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    models::{distinct_stocks, group_watchlists, Stock, StockId, UserId, Watchlist, WatchlistId, WatchlistStockRow},
    DbError,
};

use super::WatchlistRepository;

#[derive(Debug)]
struct WatchlistRecord {
    user_id: UserId,
    name: String,
}

#[derive(Debug, Default)]
struct State {
    last_id: WatchlistId,
    stocks: BTreeMap<StockId, String>,
    watchlists: BTreeMap<WatchlistId, WatchlistRecord>,
    /// `(watchlist_id, stock_id)` in insertion order.
    memberships: Vec<(WatchlistId, StockId)>,
}

impl State {
    fn check_stocks(&self, stock_ids: &[StockId]) -> Result<(), DbError> {
        match stock_ids.iter().find(|id| !self.stocks.contains_key(id)) {
            Some(missing) => Err(DbError::Integrity(format!("stock {missing} does not exist"))),
            None => Ok(()),
        }
    }

    fn stocks_of(&self, watchlist_id: WatchlistId) -> impl Iterator<Item = Stock> + '_ {
        self.memberships
            .iter()
            .filter(move |(w, _)| *w == watchlist_id)
            .filter_map(move |(_, stock_id)| {
                self.stocks.get(stock_id).map(|symbol| Stock {
                    id: *stock_id,
                    symbol: symbol.clone(),
                })
            })
    }
}

#[derive(Debug, Default)]
pub struct MemoryWatchlistStore {
    state: Mutex<State>,
}

impl MemoryWatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with `(id, symbol)` reference stocks.
    pub fn with_stocks<I, S>(stocks: I) -> Self
    where
        I: IntoIterator<Item = (StockId, S)>,
        S: Into<String>,
    {
        let store = Self::new();
        for (id, symbol) in stocks {
            store.add_stock(id, symbol);
        }
        store
    }

    /// Insert or replace a reference stock.
    pub fn add_stock(&self, id: StockId, symbol: impl Into<String>) {
        self.lock().stocks.insert(id, symbol.into());
    }

    /// Number of membership rows currently stored for `watchlist_id`.
    pub fn membership_count(&self, watchlist_id: WatchlistId) -> usize {
        self.lock()
            .memberships
            .iter()
            .filter(|(w, _)| *w == watchlist_id)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // a panic mid-call never leaves a half-applied write behind, so the
        // state is still consistent after poisoning
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl WatchlistRepository for MemoryWatchlistStore {
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Watchlist>, DbError> {
        let guard = self.lock();
        let state: &State = &guard;
        let rows: Vec<WatchlistStockRow> = state
            .watchlists
            .iter()
            .filter(|(_, record)| record.user_id == user_id)
            .flat_map(|(id, record)| {
                state.stocks_of(*id).map(move |stock| WatchlistStockRow {
                    watchlist_id: *id,
                    name: record.name.clone(),
                    stock_id: stock.id,
                    symbol: stock.symbol,
                })
            })
            .collect();
        Ok(group_watchlists(rows))
    }

    async fn list_distinct_stocks_by_user(&self, user_id: UserId) -> Result<Vec<Stock>, DbError> {
        let watchlists = self.list_by_user(user_id).await?;
        Ok(distinct_stocks(&watchlists))
    }

    async fn exists(&self, watchlist_id: WatchlistId, user_id: UserId) -> Result<bool, DbError> {
        Ok(self
            .lock()
            .watchlists
            .get(&watchlist_id)
            .is_some_and(|record| record.user_id == user_id))
    }

    async fn get_by_id(&self, watchlist_id: WatchlistId) -> Result<Watchlist, DbError> {
        let state = self.lock();
        let record = state
            .watchlists
            .get(&watchlist_id)
            .ok_or(DbError::NotFound { resource: "watchlist", id: watchlist_id })?;
        Ok(Watchlist {
            id: watchlist_id,
            name: record.name.clone(),
            stocks: state.stocks_of(watchlist_id).collect(),
        })
    }

    async fn create(
        &self,
        user_id: UserId,
        name: &str,
        stock_ids: &[StockId],
    ) -> Result<WatchlistId, DbError> {
        let mut state = self.lock();
        state.check_stocks(stock_ids)?;

        let watchlist_id = state
            .last_id
            .checked_add(1)
            .ok_or_else(|| DbError::Integrity("watchlist id sequence exhausted".into()))?;
        state.last_id = watchlist_id;
        state.watchlists.insert(
            watchlist_id,
            WatchlistRecord { user_id, name: name.to_owned() },
        );
        state
            .memberships
            .extend(stock_ids.iter().map(|stock_id| (watchlist_id, *stock_id)));

        debug!(watchlist_id, stocks = stock_ids.len(), "watchlist created in memory");
        Ok(watchlist_id)
    }

    async fn update(
        &self,
        watchlist_id: WatchlistId,
        name: &str,
        stock_ids: &[StockId],
    ) -> Result<(), DbError> {
        let mut state = self.lock();
        if !stock_ids.is_empty() && !state.watchlists.contains_key(&watchlist_id) {
            return Err(DbError::Integrity(format!("watchlist {watchlist_id} does not exist")));
        }
        state.check_stocks(stock_ids)?;

        if let Some(record) = state.watchlists.get_mut(&watchlist_id) {
            record.name = name.to_owned();
        }
        state.memberships.retain(|(w, _)| *w != watchlist_id);
        state
            .memberships
            .extend(stock_ids.iter().map(|stock_id| (watchlist_id, *stock_id)));
        Ok(())
    }

    async fn delete(&self, watchlist_id: WatchlistId) -> Result<(), DbError> {
        let mut state = self.lock();
        state.memberships.retain(|(w, _)| *w != watchlist_id);
        state.watchlists.remove(&watchlist_id);
        Ok(())
    }
}
