//! Bulk writes into the `watchlist_stocks` junction table.

use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::debug;

use crate::config::BulkInsertMode;
use crate::models::{StockId, WatchlistId};

const COPY_MEMBERSHIPS: &str = "COPY watchlist_stocks (watchlist_id, stock_id) FROM STDIN";

/// Postgres caps a statement at 65535 bind parameters; two per row.
const VALUES_CHUNK_ROWS: usize = 10_000;

/// Write one membership row per entry of `stock_ids`, duplicates included.
///
/// Must run inside the caller's transaction. Returns the number of rows written.
pub(crate) async fn insert_memberships(
    conn: &mut PgConnection,
    mode: BulkInsertMode,
    watchlist_id: WatchlistId,
    stock_ids: &[StockId],
) -> Result<u64, sqlx::Error> {
    let written = match mode {
        BulkInsertMode::Copy => copy_memberships(conn, watchlist_id, stock_ids).await?,
        BulkInsertMode::Values => insert_values(conn, watchlist_id, stock_ids).await?,
    };
    debug!(watchlist_id, written, ?mode, "memberships written");
    Ok(written)
}

async fn copy_memberships(
    conn: &mut PgConnection,
    watchlist_id: WatchlistId,
    stock_ids: &[StockId],
) -> Result<u64, sqlx::Error> {
    let mut copy = conn.copy_in_raw(COPY_MEMBERSHIPS).await?;
    copy.send(copy_payload(watchlist_id, stock_ids).into_bytes()).await?;
    copy.finish().await
}

async fn insert_values(
    conn: &mut PgConnection,
    watchlist_id: WatchlistId,
    stock_ids: &[StockId],
) -> Result<u64, sqlx::Error> {
    let mut written = 0;
    for chunk in stock_ids.chunks(VALUES_CHUNK_ROWS) {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO watchlist_stocks (watchlist_id, stock_id) ");
        builder.push_values(chunk, |mut row, stock_id| {
            row.push_bind(watchlist_id).push_bind(*stock_id);
        });
        written += builder.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(written)
}

/// Rows in `COPY ... FROM STDIN` text format: tab-separated, newline-terminated.
fn copy_payload(watchlist_id: WatchlistId, stock_ids: &[StockId]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(stock_ids.len() * 16);
    for stock_id in stock_ids {
        // writing to a String cannot fail
        let _ = writeln!(out, "{watchlist_id}\t{stock_id}");
    }
    out
}
