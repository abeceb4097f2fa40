//! SQLite-backed state store for the walk aggregator.
//!
//! Persists the aggregator snapshot as a small key/value table and
//! keeps an append-only log of raw samples for offline inspection. The
//! snapshot is always written inside one immediate transaction, so a
//! reader sees either the previous snapshot or the next one, never a
//! mix.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use walkmeter_core::aggregator::AggregatorState;
use walkmeter_core::bucket::BucketState;
use walkmeter_core::day::DayCounters;
use walkmeter_core::record::BestRecord;
use walkmeter_core::sample::{ActivityKind, ActivitySample};
use walkmeter_core::store::{StateStore, StoreError};

/// Keys of the snapshot table. The set is closed: load treats any
/// strict subset as corruption, not as defaults.
const STATE_KEYS: [&str; 8] = [
    KEY_BUCKET_START_MS,
    KEY_BUCKET_KIND,
    KEY_BUCKET_CONFIDENCE,
    KEY_DAY_START_MS,
    KEY_WALKED_TODAY,
    KEY_WALKED_YESTERDAY,
    KEY_BEST_COUNT,
    KEY_BEST_DATE,
];

const KEY_BUCKET_START_MS: &str = "bucket_start_ms";
const KEY_BUCKET_KIND: &str = "bucket_kind";
const KEY_BUCKET_CONFIDENCE: &str = "bucket_confidence";
const KEY_DAY_START_MS: &str = "day_start_ms";
const KEY_WALKED_TODAY: &str = "walked_today";
const KEY_WALKED_YESTERDAY: &str = "walked_yesterday";
const KEY_BEST_COUNT: &str = "best_count";
const KEY_BEST_DATE: &str = "best_date";

/// SQLite-level failures, wrapped before they cross into the core's
/// store error taxonomy.
#[derive(Error, Debug)]
pub enum SqliteStoreError {
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("corrupt state value for {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// A logged sample row, winner plus candidates flattened by rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLogRow {
    pub timestamp_ms: i64,
    /// 0 is the winning classification; candidates follow in report
    /// order.
    pub rank: u32,
    pub kind: ActivityKind,
    pub confidence: u8,
}

/// Durable store backed by a single SQLite file.
pub struct SqliteStateStore {
    conn: Connection,
}

impl SqliteStateStore {
    /// Open (or create) the database at `path` and ensure the schema
    /// exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SqliteStoreError> {
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", &"WAL")?;
        conn.pragma_update(None, "synchronous", &"NORMAL")?;
        let store = SqliteStateStore { conn };
        store.init_schema()?;
        tracing::debug!(path = %path.as_ref().display(), "state store opened");
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), SqliteStoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS aggregation_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sample_log (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp_ms INTEGER NOT NULL,
                rank         INTEGER NOT NULL,
                kind         TEXT NOT NULL,
                confidence   INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sample_log_ts
                ON sample_log (timestamp_ms);
            "#,
        )?;
        Ok(())
    }

    /// Append raw samples to the log, winner at rank 0 and candidates
    /// after it. One transaction per batch.
    pub fn append_samples(&mut self, samples: &[ActivitySample]) -> Result<(), SqliteStoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO sample_log (timestamp_ms, rank, kind, confidence)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for sample in samples {
                stmt.execute(params![
                    sample.timestamp_ms,
                    0u32,
                    sample.kind.name(),
                    sample.confidence,
                ])?;
                for (i, cand) in sample.candidates.iter().enumerate() {
                    stmt.execute(params![
                        sample.timestamp_ms,
                        (i + 1) as u32,
                        cand.kind.name(),
                        cand.confidence,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Read back the sample log in insertion order.
    pub fn read_sample_log(&self) -> Result<Vec<SampleLogRow>, SqliteStoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp_ms, rank, kind, confidence FROM sample_log ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let kind_name: String = row.get(2)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u32>(1)?,
                kind_name,
                row.get::<_, u8>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (timestamp_ms, rank, kind_name, confidence) = row?;
            let kind = ActivityKind::parse(&kind_name).ok_or_else(|| SqliteStoreError::Corrupt {
                key: "sample_log.kind".into(),
                reason: format!("unknown activity kind {:?}", kind_name),
            })?;
            out.push(SampleLogRow {
                timestamp_ms,
                rank,
                kind,
                confidence,
            });
        }
        Ok(out)
    }

    fn read_key(&self, key: &str) -> Result<Option<String>, SqliteStoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM aggregation_state WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn load_snapshot(&self) -> Result<Option<AggregatorState>, StoreError> {
        let mut values = Vec::with_capacity(STATE_KEYS.len());
        let mut missing = Vec::new();
        for key in STATE_KEYS {
            match self.read_key(key).map_err(read_err)? {
                Some(v) => values.push(v),
                None => missing.push(key),
            }
        }
        if missing.len() == STATE_KEYS.len() {
            return Ok(None);
        }
        if !missing.is_empty() {
            return Err(StoreError::Incomplete(missing.join(", ")));
        }

        let kind = ActivityKind::parse(&values[1])
            .ok_or_else(|| StoreError::Read(format!("unknown activity kind {:?}", values[1])))?;
        Ok(Some(AggregatorState {
            bucket: BucketState {
                start_ms: parse_field(KEY_BUCKET_START_MS, &values[0])?,
                kind,
                confidence: parse_field(KEY_BUCKET_CONFIDENCE, &values[2])?,
            },
            days: DayCounters {
                day_start_ms: parse_field(KEY_DAY_START_MS, &values[3])?,
                walked_today: parse_field(KEY_WALKED_TODAY, &values[4])?,
                walked_yesterday: parse_field(KEY_WALKED_YESTERDAY, &values[5])?,
            },
            record: BestRecord {
                best_count: parse_field(KEY_BEST_COUNT, &values[6])?,
                best_date: values[7].clone(),
            },
        }))
    }

    fn commit_snapshot(&mut self, state: &AggregatorState) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .map_err(|e| write_err(SqliteStoreError::Sql(e)))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO aggregation_state (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                )
                .map_err(|e| write_err(SqliteStoreError::Sql(e)))?;
            let pairs: [(&str, String); 8] = [
                (KEY_BUCKET_START_MS, state.bucket.start_ms.to_string()),
                (KEY_BUCKET_KIND, state.bucket.kind.name().to_string()),
                (KEY_BUCKET_CONFIDENCE, state.bucket.confidence.to_string()),
                (KEY_DAY_START_MS, state.days.day_start_ms.to_string()),
                (KEY_WALKED_TODAY, state.days.walked_today.to_string()),
                (KEY_WALKED_YESTERDAY, state.days.walked_yesterday.to_string()),
                (KEY_BEST_COUNT, state.record.best_count.to_string()),
                (KEY_BEST_DATE, state.record.best_date.clone()),
            ];
            for (key, value) in pairs {
                stmt.execute(params![key, value])
                    .map_err(|e| write_err(SqliteStoreError::Sql(e)))?;
            }
        }
        tx.commit().map_err(|e| write_err(SqliteStoreError::Sql(e)))?;
        Ok(())
    }
}

impl StateStore for SqliteStateStore {
    fn load(&self) -> Result<Option<AggregatorState>, StoreError> {
        self.load_snapshot()
    }

    fn commit(&mut self, state: &AggregatorState) -> Result<(), StoreError> {
        self.commit_snapshot(state)
    }
}

fn read_err(e: SqliteStoreError) -> StoreError {
    StoreError::Read(e.to_string())
}

fn write_err(e: SqliteStoreError) -> StoreError {
    StoreError::Write(e.to_string())
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, StoreError> {
    value
        .parse::<T>()
        .map_err(|_| StoreError::Read(format!("corrupt value for {key}: {value:?}")))
}
