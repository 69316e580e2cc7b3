//! Behaviour checks shared by the memory and Postgres store tests.
//!
//! Every check takes a freshly seeded store holding [`STOCKS`] and nothing else.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use traderdb::{DbError, StockId, WatchlistRepository};

pub const STOCKS: &[(StockId, &str)] = &[
    (1, "AAPL"),
    (2, "MSFT"),
    (3, "GOOG"),
    (4, "AMZN"),
    (5, "NVDA"),
    (101, "TSLA"),
    (102, "META"),
];

pub const MISSING_ID: i32 = 987_654;

pub fn id_set(ids: impl IntoIterator<Item = StockId>) -> BTreeSet<StockId> {
    ids.into_iter().collect()
}

pub async fn list_by_user_skips_empty_and_foreign_watchlists<R: WatchlistRepository>(repo: &R) {
    let tech = repo.create(7, "Tech", &[1, 2]).await.unwrap();
    let _empty = repo.create(7, "Empty", &[]).await.unwrap();
    let chips = repo.create(7, "Chips", &[3]).await.unwrap();
    let _other = repo.create(8, "Other", &[4]).await.unwrap();

    let mut lists = repo.list_by_user(7).await.unwrap();
    lists.sort_by_key(|w| w.id);

    assert_eq!(lists.iter().map(|w| w.id).collect::<Vec<_>>(), vec![tech, chips]);
    assert_eq!(lists[0].name, "Tech");
    assert_eq!(id_set(lists[0].stock_ids()), id_set([1, 2]));
    assert_eq!(lists[1].name, "Chips");
    assert_eq!(lists[1].stocks[0].symbol, "GOOG");

    assert!(repo.list_by_user(99).await.unwrap().is_empty());
}

pub async fn get_by_id_returns_empty_stocks_for_empty_watchlist<R: WatchlistRepository>(repo: &R) {
    let id = repo.create(7, "Empty", &[]).await.unwrap();

    let w = repo.get_by_id(id).await.unwrap();
    assert_eq!(w.id, id);
    assert_eq!(w.name, "Empty");
    assert!(w.stocks.is_empty());
    // same watchlist is invisible to the join-based listing
    assert!(repo.list_by_user(7).await.unwrap().is_empty());
}

pub async fn get_by_id_on_missing_id_is_not_found<R: WatchlistRepository>(repo: &R) {
    let err = repo.get_by_id(MISSING_ID).await.unwrap_err();
    assert!(
        matches!(err, DbError::NotFound { resource: "watchlist", id: MISSING_ID }),
        "{err:?}"
    );
}

pub async fn create_then_get_round_trips<R: WatchlistRepository>(repo: &R) {
    let id = repo.create(7, "Tech", &[101, 102]).await.unwrap();

    let w = repo.get_by_id(id).await.unwrap();
    assert_eq!(w.id, id);
    assert_eq!(w.name, "Tech");
    assert_eq!(id_set(w.stock_ids()), id_set([101, 102]));
    let symbols: BTreeSet<_> = w.stocks.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(symbols, BTreeSet::from(["TSLA", "META"]));
    assert!(repo.exists(id, 7).await.unwrap());
}

pub async fn update_replaces_name_and_membership<R: WatchlistRepository>(repo: &R) {
    let id = repo.create(7, "Before", &[1, 2, 3]).await.unwrap();

    repo.update(id, "After", &[4, 5]).await.unwrap();

    let w = repo.get_by_id(id).await.unwrap();
    assert_eq!(w.name, "After");
    assert_eq!(w.stocks.len(), 2);
    assert_eq!(id_set(w.stock_ids()), id_set([4, 5]));
}

pub async fn update_to_empty_clears_membership<R: WatchlistRepository>(repo: &R) {
    let id = repo.create(7, "Full", &[1, 2]).await.unwrap();

    repo.update(id, "Full", &[]).await.unwrap();

    assert!(repo.get_by_id(id).await.unwrap().stocks.is_empty());
    assert!(repo.exists(id, 7).await.unwrap());
}

pub async fn delete_removes_watchlist<R: WatchlistRepository>(repo: &R) {
    let id = repo.create(7, "Doomed", &[1, 2]).await.unwrap();
    let survivor = repo.create(7, "Survivor", &[2]).await.unwrap();

    repo.delete(id).await.unwrap();

    assert!(!repo.exists(id, 7).await.unwrap());
    assert!(repo.get_by_id(id).await.unwrap_err().is_not_found());
    assert_eq!(repo.get_by_id(survivor).await.unwrap().stock_ids(), vec![2]);
}

pub async fn unknown_ids_are_noops<R: WatchlistRepository>(repo: &R) {
    repo.update(MISSING_ID, "ghost", &[]).await.unwrap();
    repo.delete(MISSING_ID).await.unwrap();
    assert!(!repo.exists(MISSING_ID, 7).await.unwrap());
}

pub async fn exists_is_scoped_to_owner<R: WatchlistRepository>(repo: &R) {
    let id = repo.create(7, "Mine", &[1]).await.unwrap();

    assert!(repo.exists(id, 7).await.unwrap());
    assert!(!repo.exists(id, 8).await.unwrap());
    assert!(!repo.exists(MISSING_ID, 7).await.unwrap());
}

pub async fn duplicate_stock_ids_are_kept<R: WatchlistRepository>(repo: &R) {
    let id = repo.create(7, "Twice", &[1, 1]).await.unwrap();
    assert_eq!(repo.get_by_id(id).await.unwrap().stock_ids(), vec![1, 1]);
}

pub async fn distinct_stocks_span_all_watchlists<R: WatchlistRepository>(repo: &R) {
    repo.create(7, "A", &[1, 2]).await.unwrap();
    repo.create(7, "B", &[2, 3, 3]).await.unwrap();
    repo.create(8, "Other", &[5]).await.unwrap();

    let stocks = repo.list_distinct_stocks_by_user(7).await.unwrap();
    assert_eq!(stocks.len(), 3);
    assert_eq!(id_set(stocks.iter().map(|s| s.id)), id_set([1, 2, 3]));
}

pub async fn concurrent_updates_settle_on_one_call<R>(repo: Arc<R>)
where
    R: WatchlistRepository + 'static,
{
    let id = repo.create(7, "v-start", &[1]).await.unwrap();
    let variants: Vec<(String, Vec<StockId>)> = vec![
        ("v0".into(), vec![1, 2]),
        ("v1".into(), vec![3, 4, 5]),
        ("v2".into(), vec![101]),
        ("v3".into(), vec![]),
        ("v4".into(), vec![2, 102, 4]),
    ];

    let handles: Vec<_> = variants
        .iter()
        .cloned()
        .map(|(name, stocks)| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.update(id, &name, &stocks).await })
        })
        .collect();
    for handle in handles {
        handle.await.expect("task panicked").unwrap();
    }

    let w = repo.get_by_id(id).await.unwrap();
    let (_, expected) = variants
        .iter()
        .find(|(name, _)| *name == w.name)
        .expect("final name comes from one of the updates");
    assert_eq!(id_set(w.stock_ids()), id_set(expected.iter().copied()));
    assert_eq!(w.stocks.len(), expected.len());
}
