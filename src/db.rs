use chrono::{DateTime, Datelike, FixedOffset, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

use crate::month::MonthSelector;
use crate::price_range::PriceRange;

/// A single sale/offer record from the seed dataset
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Seed id; 0 means "let the store assign one"
    #[serde(default)]
    pub id: i64,

    pub title: String,

    pub description: String,

    pub price: f64,

    pub category: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// The seed file calls this `sold`
    #[serde(alias = "sold")]
    pub is_sold: bool,

    pub date_of_sale: DateTime<FixedOffset>,
}

impl Transaction {
    /// Calendar month of the sale, 1-12, in the recorded offset
    pub fn sale_month(&self) -> u32 {
        self.date_of_sale.month()
    }

    /// Case-insensitive substring match on title, description, or price text
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = fold_case(term);
        fold_case(&self.title).contains(&needle)
            || fold_case(&self.description).contains(&needle)
            || price_text(self.price).contains(&needle)
    }
}

/// Unicode lowercase used for search on every store
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Searchable rendering of a price: `150` for whole values, `12.5` otherwise
pub fn price_text(price: f64) -> String {
    price.to_string()
}

/// Search + pagination window for listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
}

impl ListQuery {
    pub const DEFAULT_PER_PAGE: u32 = 10;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Search term with surrounding whitespace removed, `None` if blank
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            page: 1,
            per_page: Self::DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read/import access to the transaction collection.
///
/// Calls are blocking; async callers go through [`crate::dataset::Dataset`],
/// which runs them on the blocking pool.
pub trait TransactionStore: Send + Sync {
    /// Insert all records or none. Records whose id already exists are skipped.
    /// Returns the number of newly inserted records.
    fn insert_many(&self, records: &[Transaction]) -> StoreResult<usize>;

    fn list(&self, query: &ListQuery) -> StoreResult<Vec<Transaction>>;

    fn find_by_month(&self, month: MonthSelector) -> StoreResult<Vec<Transaction>>;

    fn count_by_month_and_price_range(
        &self,
        month: MonthSelector,
        range: &PriceRange,
    ) -> StoreResult<u64>;

    fn count_by_month_grouped_by_category(
        &self,
        month: MonthSelector,
    ) -> StoreResult<BTreeMap<String, u64>>;

    fn count(&self) -> StoreResult<u64>;

    /// Note an import in the audit trail, if the store keeps one
    fn record_import(&self, _import: &ImportRecord) -> StoreResult<()> {
        Ok(())
    }
}

/// Audit entry for one bulk import
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImportRecord {
    pub import_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub received: usize,
    pub inserted: usize,
}

impl ImportRecord {
    pub fn new(source: &str, received: usize, inserted: usize) -> Self {
        Self {
            import_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            source: source.to_string(),
            received,
            inserted,
        }
    }
}

/// SQLite-backed store: one connection shared behind a mutex
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and create if needed) the database. `:memory:` opens an in-memory one.
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(Path::new(path))?
        };
        setup_database(&conn)?;
        info!(path, "Transaction store opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(":memory:")
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Most recent imports first
    pub fn import_history(&self) -> StoreResult<Vec<ImportRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT import_id, timestamp, source, received, inserted
             FROM imports
             ORDER BY id DESC",
        )?;

        let history = stmt
            .query_map([], |row| {
                let timestamp_str: String = row.get(1)?;
                Ok(ImportRecord {
                    import_id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
                        })?
                        .with_timezone(&Utc),
                    source: row.get(2)?,
                    received: row.get(3)?,
                    inserted: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(history)
    }
}

/// SQLite's LOWER() and LIKE fold ASCII only, so search goes through
/// the same folding and price rendering as [`Transaction::matches_search`]
fn register_search_functions(conn: &Connection) -> StoreResult<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("fold_case", 1, flags, |ctx| {
        let text: String = ctx.get(0)?;
        Ok(fold_case(&text))
    })?;
    conn.create_scalar_function("price_text", 1, flags, |ctx| {
        let price: f64 = ctx.get(0)?;
        Ok(price_text(price))
    })?;

    Ok(())
}

pub fn setup_database(conn: &Connection) -> StoreResult<()> {
    register_search_functions(conn)?;

    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(%journal_mode, "Journal mode set");

    // sale_month is extracted from date_of_sale at import so month filters
    // compare numbers instead of matching text
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            price REAL NOT NULL CHECK (price >= 0),
            category TEXT NOT NULL,
            image TEXT,
            is_sold INTEGER NOT NULL,
            date_of_sale TEXT NOT NULL,
            sale_month INTEGER NOT NULL CHECK (sale_month BETWEEN 1 AND 12),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS imports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            import_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            source TEXT NOT NULL,
            received INTEGER NOT NULL,
            inserted INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sale_month ON transactions(sale_month)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sale_month_category ON transactions(sale_month, category)",
        [],
    )?;

    Ok(())
}

const SELECT_COLUMNS: &str =
    "SELECT id, title, description, price, category, image, is_sold, date_of_sale FROM transactions";

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(7)?;
    let date_of_sale = DateTime::parse_from_rfc3339(&date_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Transaction {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        category: row.get(4)?,
        image: row.get(5)?,
        is_sold: row.get(6)?,
        date_of_sale,
    })
}

/// Escape LIKE wildcards so the search term matches literally
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in fold_case(term).chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn to_i64(value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidData(format!("{value} out of range")))
}

impl TransactionStore for SqliteStore {
    fn insert_many(&self, records: &[Transaction]) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        let mut duplicates = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions (
                    id, title, description, price, category, image, is_sold,
                    date_of_sale, sale_month
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(id) DO NOTHING",
            )?;

            for record in records {
                let id = (record.id != 0).then_some(record.id);
                let changed = stmt.execute(params![
                    id,
                    record.title,
                    record.description,
                    record.price,
                    record.category,
                    record.image,
                    record.is_sold,
                    record.date_of_sale.to_rfc3339(),
                    record.sale_month(),
                ])?;

                if changed == 0 {
                    duplicates += 1;
                } else {
                    inserted += 1;
                }
            }
        }

        tx.commit()?;
        debug!(inserted, duplicates, "Bulk insert committed");

        Ok(inserted)
    }

    fn list(&self, query: &ListQuery) -> StoreResult<Vec<Transaction>> {
        let conn = self.conn()?;
        let limit = i64::from(query.per_page);
        let offset = to_i64(query.offset())?;

        let transactions = match query.search_term() {
            Some(term) => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS}
                     WHERE fold_case(title) LIKE ?1 ESCAPE '\\'
                        OR fold_case(description) LIKE ?1 ESCAPE '\\'
                        OR price_text(price) LIKE ?1 ESCAPE '\\'
                     ORDER BY id
                     LIMIT ?2 OFFSET ?3"
                ))?;
                let rows = stmt.query_map(params![like_pattern(term), limit, offset], row_to_transaction)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} ORDER BY id LIMIT ?1 OFFSET ?2"
                ))?;
                let rows = stmt.query_map(params![limit, offset], row_to_transaction)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(transactions)
    }

    fn find_by_month(&self, month: MonthSelector) -> StoreResult<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE sale_month = ?1 ORDER BY id"
        ))?;

        let transactions = stmt
            .query_map([month.number()], row_to_transaction)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    fn count_by_month_and_price_range(
        &self,
        month: MonthSelector,
        range: &PriceRange,
    ) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions
             WHERE sale_month = ?1 AND price >= ?2 AND (?3 IS NULL OR price < ?3)",
            params![month.number(), range.min, range.max],
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }

    fn count_by_month_grouped_by_category(
        &self,
        month: MonthSelector,
    ) -> StoreResult<BTreeMap<String, u64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM transactions
             WHERE sale_month = ?1
             GROUP BY category",
        )?;

        let groups = stmt
            .query_map([month.number()], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get::<_, String>(0)?, count as u64))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(groups)
    }

    fn count(&self) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

        Ok(count as u64)
    }

    fn record_import(&self, import: &ImportRecord) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO imports (import_id, timestamp, source, received, inserted)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                import.import_id,
                import.timestamp.to_rfc3339(),
                import.source,
                import.received,
                import.inserted,
            ],
        )?;

        Ok(())
    }
}

/// Look up a single transaction by id
pub fn get_transaction(store: &SqliteStore, id: i64) -> StoreResult<Option<Transaction>> {
    let conn = store.conn()?;
    let transaction = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            [id],
            row_to_transaction,
        )
        .optional()?;

    Ok(transaction)
}
