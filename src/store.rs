use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::events::GamePoolEvent;
use crate::round::RoundId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePoolActivityRecord {
    pub id: String,
    pub ts: i64,
    pub kind: String,
    pub round_id: RoundId,
    pub bettor: Option<String>,
    /// Base units as a decimal string; SQLite integers stop at 64 bits.
    pub amount: Option<String>,
    /// Full event as JSON.
    pub payload: String,
}

impl GamePoolActivityRecord {
    pub fn from_event(event: &GamePoolEvent) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            ts: event.ts(),
            kind: event.kind().to_string(),
            round_id: event.round(),
            bettor: event.bettor().map(|b| b.to_string()),
            amount: event.amount().map(|a| a.to_string()),
            payload: serde_json::to_string(event).context("encode activity payload")?,
        })
    }

    pub fn event(&self) -> Result<GamePoolEvent> {
        serde_json::from_str(&self.payload).context("decode activity payload")
    }
}

#[derive(Clone)]
pub struct GamePoolDb {
    conn: Arc<Mutex<Connection>>,
}

impl GamePoolDb {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).context("open gamepool db")?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS gamepool_activity (
                id TEXT PRIMARY KEY,
                ts INTEGER NOT NULL,
                kind TEXT NOT NULL,
                round_id INTEGER NOT NULL,
                bettor TEXT,
                amount TEXT,
                payload TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_gamepool_activity_ts ON gamepool_activity(ts DESC)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_gamepool_activity_round_ts ON gamepool_activity(round_id, ts DESC)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn insert_activity(&self, rec: &GamePoolActivityRecord) -> Result<()> {
        let conn = self.conn.lock().await;
        insert_record(&conn, rec)
    }

    /// All or nothing: one transaction per batch.
    pub async fn insert_events(&self, events: &[GamePoolEvent]) -> Result<usize> {
        let records = events
            .iter()
            .map(GamePoolActivityRecord::from_event)
            .collect::<Result<Vec<_>>>()?;

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().context("begin activity batch")?;
        for rec in &records {
            insert_record(&tx, rec)?;
        }
        tx.commit().context("commit activity batch")?;
        Ok(records.len())
    }

    /// Newest first. `limit` is clamped to 1..=1000.
    pub async fn list_activity(
        &self,
        limit: usize,
        round_id: Option<RoundId>,
    ) -> Result<Vec<GamePoolActivityRecord>> {
        let limit = limit.clamp(1, 1000) as i64;
        let conn = self.conn.lock().await;

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<GamePoolActivityRecord> {
            let round_id: i64 = row.get(3)?;
            Ok(GamePoolActivityRecord {
                id: row.get(0)?,
                ts: row.get(1)?,
                kind: row.get(2)?,
                round_id: round_id as RoundId,
                bettor: row.get(4)?,
                amount: row.get(5)?,
                payload: row.get(6)?,
            })
        };

        let mut out = Vec::new();
        if let Some(round_id) = round_id {
            let round_id = i64::try_from(round_id).context("round id out of range")?;
            let mut stmt = conn.prepare_cached(
                "SELECT id, ts, kind, round_id, bettor, amount, payload \
                 FROM gamepool_activity WHERE round_id = ?1 ORDER BY ts DESC, rowid DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![round_id, limit], map_row)?;
            for r in rows {
                out.push(r?);
            }
            return Ok(out);
        }

        let mut stmt = conn.prepare_cached(
            "SELECT id, ts, kind, round_id, bettor, amount, payload \
             FROM gamepool_activity ORDER BY ts DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], map_row)?;
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

fn insert_record(conn: &Connection, rec: &GamePoolActivityRecord) -> Result<()> {
    let round_id = i64::try_from(rec.round_id).context("round id out of range")?;
    conn.execute(
        "INSERT OR REPLACE INTO gamepool_activity \
         (id, ts, kind, round_id, bettor, amount, payload) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &rec.id,
            rec.ts,
            &rec.kind,
            round_id,
            rec.bettor.as_deref(),
            rec.amount.as_deref(),
            &rec.payload,
        ],
    )?;
    Ok(())
}
