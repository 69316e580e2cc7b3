//! `traderdb` crate — data-access layer for user watchlists.
//!
//! Provides a connection pool, typed row structs, and the
//! [`WatchlistRepository`] operations over the `watchlists`,
//! `watchlist_stocks` and `stocks` tables. Schema management and
//! authorization live outside this crate.

pub mod config;
pub mod deadline;
pub mod error;
pub mod models;
pub mod pool;
pub mod repository;

pub use config::{BulkInsertMode, StoreConfig};
pub use deadline::Deadline;
pub use error::{DbError, TxStep};
pub use models::{Stock, StockId, UserId, Watchlist, WatchlistId};
pub use pool::DbPool;
pub use repository::{MemoryWatchlistStore, WatchlistRepository, WatchlistStore};
