//! Row structs and the in-memory shapes returned to callers.
//!
//! `stocks` is reference data owned elsewhere; `watchlists` and the
//! `watchlist_stocks` junction are the only tables this crate writes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type UserId = i32;
pub type WatchlistId = i32;
pub type StockId = i32;

// ---------------------------------------------------------------------------
// stocks
// ---------------------------------------------------------------------------

/// A ticker symbol from the `stocks` table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Stock {
    pub id: StockId,
    pub symbol: String,
}

// ---------------------------------------------------------------------------
// watchlists
// ---------------------------------------------------------------------------

/// A named collection of stocks. The owning `user_id` is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watchlist {
    pub id: WatchlistId,
    pub name: String,
    pub stocks: Vec<Stock>,
}

impl Watchlist {
    /// Stock ids in membership order.
    pub fn stock_ids(&self) -> Vec<StockId> {
        self.stocks.iter().map(|s| s.id).collect()
    }
}

/// One row of `watchlists ⋈ watchlist_stocks ⋈ stocks` for a single user.
#[derive(Debug, Clone, FromRow)]
pub struct WatchlistStockRow {
    pub watchlist_id: WatchlistId,
    pub name: String,
    pub stock_id: StockId,
    pub symbol: String,
}

/// Fold joined rows into one [`Watchlist`] per distinct watchlist id.
///
/// Stocks keep the order their rows arrived in. The order of the returned
/// watchlists is unspecified.
pub fn group_watchlists<I>(rows: I) -> Vec<Watchlist>
where
    I: IntoIterator<Item = WatchlistStockRow>,
{
    let mut by_id: HashMap<WatchlistId, Watchlist> = HashMap::new();
    for row in rows {
        by_id
            .entry(row.watchlist_id)
            .or_insert_with(|| Watchlist {
                id: row.watchlist_id,
                name: row.name,
                stocks: Vec::new(),
            })
            .stocks
            .push(Stock { id: row.stock_id, symbol: row.symbol });
    }
    by_id.into_values().collect()
}

/// Every stock across `watchlists`, once per id, in first-seen order.
pub fn distinct_stocks(watchlists: &[Watchlist]) -> Vec<Stock> {
    let mut seen: HashSet<StockId> = HashSet::new();
    watchlists
        .iter()
        .flat_map(|w| w.stocks.iter())
        .filter(|s| seen.insert(s.id))
        .cloned()
        .collect()
}
