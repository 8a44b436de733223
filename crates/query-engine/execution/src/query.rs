//! Execute a validated statement against the database.
//!
//! Only a [`ValidatedStatement`] can reach this function; the type cannot be
//! constructed outside the validation crate, so there is no code path from
//! raw model output to a connection. Execution itself adds two more layers:
//! the transaction is opened read-only, and a statement timeout applies on
//! the database side with a slightly larger client-side budget around it.

use std::time::Duration;

use query_engine_validation::ValidatedStatement;
use sqlx::PgPool;
use tracing::{info_span, Instrument};

use crate::error::Error;
use crate::rows::{rows_to_row_set, RowSet};

/// Headroom the client-side budget allows beyond the database-side timeout,
/// so the database normally cancels first and reports the better error.
const CLIENT_TIMEOUT_HEADROOM: Duration = Duration::from_secs(2);

/// Run an approved statement, returning at most `max_rows` serialized rows.
pub async fn execute(
    pool: &PgPool,
    statement: &ValidatedStatement,
    max_rows: usize,
    statement_timeout: Duration,
) -> Result<RowSet, Error> {
    let mut transaction = pool.begin().await.map_err(Error::Db)?;

    sqlx::query("SET TRANSACTION READ ONLY")
        .execute(&mut *transaction)
        .await
        .map_err(Error::Db)?;
    sqlx::query(&format!(
        "SET LOCAL statement_timeout = {}",
        statement_timeout.as_millis()
    ))
    .execute(&mut *transaction)
    .await
    .map_err(Error::Db)?;

    let timeout_ms = u64::try_from(statement_timeout.as_millis()).unwrap_or(u64::MAX);
    let fetch = sqlx::query(statement.sql()).fetch_all(&mut *transaction);
    let mut rows = match tokio::time::timeout(statement_timeout + CLIENT_TIMEOUT_HEADROOM, fetch)
        .instrument(info_span!("Fetch rows"))
        .await
    {
        Err(_elapsed) => return Err(Error::Timeout(timeout_ms)),
        Ok(result) => result.map_err(Error::Db)?,
    };
    rows.truncate(max_rows);

    let row_set = async { rows_to_row_set(&rows) }
        .instrument(info_span!("Serialize rows"))
        .await?;

    // the transaction is read-only; a failed commit still holds no changes,
    // and the drop path rolls back on every error above
    transaction.commit().await.map_err(Error::Db)?;

    tracing::info!(
        rows = row_set.row_count,
        at_row_cap = row_set.row_count == max_rows,
        "query executed"
    );

    Ok(row_set)
}
