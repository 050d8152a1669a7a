//! SQLite signal store

use super::{SignalStore, StoreError};
use crate::scanner::ScannerSignal;
use async_trait::async_trait;
use chrono::DateTime;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Durable store backed by a single SQLite file
#[derive(Clone)]
pub struct SqliteSignalStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSignalStore {
    /// Open (or create) the database at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::init(conn)
    }

    /// Private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                symbol TEXT NOT NULL,
                price REAL NOT NULL,
                rsi REAL NOT NULL,
                cvd_delta REAL NOT NULL,
                top_trader_ratio REAL NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_signals_timestamp ON signals(timestamp DESC)",
            [],
        )?;

        tracing::info!("SQLite signal store initialized");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn insert_blocking(conn: &Connection, signal: &ScannerSignal) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO signals (timestamp, symbol, price, rsi, cvd_delta, top_trader_ratio)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                signal.timestamp.timestamp_millis(),
                signal.symbol,
                signal.price,
                signal.rsi,
                signal.cvd_delta,
                signal.top_trader_ratio,
            ],
        )?;
        Ok(())
    }

    fn recent_blocking(conn: &Connection, limit: usize) -> Result<Vec<ScannerSignal>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT timestamp, symbol, price, rsi, cvd_delta, top_trader_ratio
             FROM signals ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let ms: i64 = row.get(0)?;
            Ok((
                ms,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
            ))
        })?;

        let mut signals = Vec::new();
        for row in rows {
            let (ms, symbol, price, rsi, cvd_delta, top_trader_ratio) = row?;
            let Some(timestamp) = DateTime::from_timestamp_millis(ms) else {
                tracing::warn!(timestamp = ms, symbol = %symbol, "Skipping signal with invalid timestamp");
                continue;
            };
            signals.push(ScannerSignal {
                timestamp,
                symbol,
                price,
                rsi,
                cvd_delta,
                top_trader_ratio,
            });
        }
        Ok(signals)
    }
}

#[async_trait]
impl SignalStore for SqliteSignalStore {
    async fn insert(&self, signal: &ScannerSignal) -> Result<(), StoreError> {
        let conn = Arc::clone(&self.conn);
        let signal = signal.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            Self::insert_blocking(&conn, &signal)
        })
        .await?
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ScannerSignal>, StoreError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            Self::recent_blocking(&conn, limit)
        })
        .await?
    }

    fn backend_type(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn signal(symbol: &str, ms: i64) -> ScannerSignal {
        ScannerSignal {
            timestamp: Utc.timestamp_millis_opt(ms).unwrap(),
            symbol: symbol.into(),
            price: 42.5,
            rsi: 71.25,
            cvd_delta: -350.0,
            top_trader_ratio: 1.8,
        }
    }

    #[tokio::test]
    async fn test_insert_and_recent() {
        let dir = tempdir().unwrap();
        let store = SqliteSignalStore::open(dir.path().join("signals.db")).unwrap();

        store.insert(&signal("AAAUSDT", 1_700_000_000_000)).await.unwrap();
        store.insert(&signal("BBBUSDT", 1_700_000_060_000)).await.unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].symbol, "BBBUSDT");
        assert_eq!(recent[1], signal("AAAUSDT", 1_700_000_000_000));
    }

    #[tokio::test]
    async fn test_recent_respects_limit_and_ties() {
        let store = SqliteSignalStore::in_memory().unwrap();
        for name in ["A", "B", "C"] {
            store.insert(&signal(name, 5_000)).await.unwrap();
        }

        let recent = store.recent(2).await.unwrap();
        let names: Vec<&str> = recent.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(names, vec!["C", "B"]);
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("signals.db");

        {
            let store = SqliteSignalStore::open(&path).unwrap();
            store.insert(&signal("SOLUSDT", 1_000)).await.unwrap();
        }

        let store = SqliteSignalStore::open(&path).unwrap();
        assert_eq!(store.recent(5).await.unwrap().len(), 1);
    }
}
