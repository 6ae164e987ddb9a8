use crate::error::{PipelineError, Result};
use crate::normalize::normalize;
use crate::record::{CanonicalRecord, Period};
use crate::schema::{map_and_validate, ColumnMapping};
use crate::table::RawTable;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Executor, Row, Statement};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, warn};

pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_QUERY: &str = "SELECT date, product, category, amount, client FROM sales";

const START_PLACEHOLDER: &str = ":date_start";
const END_PLACEHOLDER: &str = ":date_end";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationalConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub query: Option<String>,
}

impl RelationalConfig {
    pub fn label(&self) -> String {
        format!("mysql://{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }

    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or(DEFAULT_QUERY)
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodBound {
    Start,
    End,
}

/// Rewrite `:date_start` / `:date_end` into positional `?` markers.
///
/// Returns the rewritten query and the bound each marker stands for, in order.
pub fn bind_period_placeholders(query: &str) -> (String, Vec<PeriodBound>) {
    let mut sql = String::with_capacity(query.len());
    let mut binds = Vec::new();
    let mut rest = query;

    while let Some(pos) = rest.find(':') {
        sql.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let matched = [(START_PLACEHOLDER, PeriodBound::Start), (END_PLACEHOLDER, PeriodBound::End)]
            .into_iter()
            .find(|(name, _)| {
                tail.starts_with(name)
                    && !tail[name.len()..]
                        .chars()
                        .next()
                        .is_some_and(|c| c.is_alphanumeric() || c == '_')
            });

        match matched {
            Some((name, bound)) => {
                sql.push('?');
                binds.push(bound);
                rest = &tail[name.len()..];
            }
            None => {
                sql.push(':');
                rest = &tail[1..];
            }
        }
    }
    sql.push_str(rest);

    (sql, binds)
}

fn format_bound(period: &Period, bound: PeriodBound) -> Option<String> {
    let date = match bound {
        PeriodBound::Start => period.start,
        PeriodBound::End => period.end,
    };
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Run the configured query against MySQL and normalize the result.
///
/// One connection per call, closed once the query has finished whatever its
/// outcome. The driver is async, so it runs on a private current-thread runtime.
pub fn read_mysql(
    config: &RelationalConfig,
    mapping: &ColumnMapping,
    period: &Period,
) -> Result<Vec<CanonicalRecord>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let table = runtime.block_on(fetch_table(config, period))?;
    let table = map_and_validate(table, mapping)?;

    Ok(normalize(&table, period))
}

type QueryFuture<'c, T> = Pin<Box<dyn Future<Output = std::result::Result<T, sqlx::Error>> + 'c>>;

/// Open one connection, run `work` on it, then close it.
///
/// The close happens on every outcome of `work`; if the future is dropped or
/// unwinds instead, dropping the connection releases the socket.
async fn with_connection<T, F>(options: &MySqlConnectOptions, origin: &str, work: F) -> Result<T>
where
    F: for<'c> FnOnce(&'c mut MySqlConnection) -> QueryFuture<'c, T>,
{
    let connection_error = |cause: sqlx::Error| PipelineError::Connection {
        origin: origin.to_string(),
        cause,
    };

    info!("Connecting to {}", origin);

    let mut conn = MySqlConnection::connect_with(options)
        .await
        .map_err(connection_error)?;

    let outcome = work(&mut conn).await;

    if let Err(e) = conn.close().await {
        warn!("Failed to close connection to {}: {}", origin, e);
    }

    outcome.map_err(connection_error)
}

async fn fetch_table(config: &RelationalConfig, period: &Period) -> Result<RawTable> {
    let origin = config.label();
    let query = config.query().to_string();
    let period = *period;
    let label = origin.clone();

    with_connection(&config.connect_options(), &origin, move |conn| {
        Box::pin(async move { run_query(conn, &label, &query, &period).await })
    })
    .await
}

async fn run_query(
    conn: &mut MySqlConnection,
    origin: &str,
    query: &str,
    period: &Period,
) -> std::result::Result<RawTable, sqlx::Error> {
    let (sql, binds) = bind_period_placeholders(query);
    let statement = conn.prepare(&sql).await?;

    let headers = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut prepared = statement.query();
    for bound in binds {
        prepared = prepared.bind(format_bound(period, bound));
    }

    let rows = prepared.fetch_all(&mut *conn).await?;
    debug!("Fetched {} rows from {}", rows.len(), origin);

    let mut table = RawTable::new(origin, headers);
    for row in &rows {
        table.push_row((0..row.len()).map(|idx| cell_text(row, idx)).collect());
    }

    Ok(table)
}

/// Typed reads tried on a cell, in order. The first one the driver accepts wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellDecoder {
    Text,
    Date,
    DateTime,
    Decimal,
    Signed,
    Unsigned,
    Double,
    Float,
    UncheckedText,
    UncheckedBytes,
}

const CELL_DECODERS: [CellDecoder; 10] = [
    CellDecoder::Text,
    CellDecoder::Date,
    CellDecoder::DateTime,
    CellDecoder::Decimal,
    CellDecoder::Signed,
    CellDecoder::Unsigned,
    CellDecoder::Double,
    CellDecoder::Float,
    CellDecoder::UncheckedText,
    CellDecoder::UncheckedBytes,
];

fn decode_as(
    row: &MySqlRow,
    idx: usize,
    decoder: CellDecoder,
) -> std::result::Result<Option<String>, sqlx::Error> {
    let text = match decoder {
        CellDecoder::Text => row.try_get::<Option<String>, _>(idx)?,
        CellDecoder::Date => row
            .try_get::<Option<NaiveDate>, _>(idx)?
            .map(|d| d.format("%Y-%m-%d").to_string()),
        CellDecoder::DateTime => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        CellDecoder::Decimal => row.try_get::<Option<Decimal>, _>(idx)?.map(|d| d.to_string()),
        CellDecoder::Signed => row.try_get::<Option<i64>, _>(idx)?.map(|n| n.to_string()),
        CellDecoder::Unsigned => row.try_get::<Option<u64>, _>(idx)?.map(|n| n.to_string()),
        CellDecoder::Double => row.try_get::<Option<f64>, _>(idx)?.map(|n| n.to_string()),
        CellDecoder::Float => row.try_get::<Option<f32>, _>(idx)?.map(|n| n.to_string()),
        CellDecoder::UncheckedText => row.try_get_unchecked::<Option<String>, _>(idx)?,
        CellDecoder::UncheckedBytes => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(idx)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
    };
    Ok(text)
}

/// Walk [`CELL_DECODERS`] until one succeeds. A NULL cell stays `None`.
fn first_decoded<F>(mut decode: F) -> Option<String>
where
    F: FnMut(CellDecoder) -> std::result::Result<Option<String>, sqlx::Error>,
{
    CELL_DECODERS
        .iter()
        .find_map(|&decoder| decode(decoder).ok())
        .flatten()
}

/// Render a cell as text so database rows share the CSV normalization path.
fn cell_text(row: &MySqlRow, idx: usize) -> Option<String> {
    first_decoded(|decoder| decode_as(row, idx, decoder))
}
