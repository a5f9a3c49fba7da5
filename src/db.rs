use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A fully parsed notice, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeRow {
    pub sequence_number: i64,
    pub title: String,
    pub author: String,
    pub published_date: NaiveDate,
    pub view_count: u32,
    pub link: String,
}

/// A stored notice. `id` is only meaningful within the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: i64,
    #[serde(flatten)]
    pub row: NoticeRow,
}

/// Current-snapshot table. Each `Store` owns one SQLite connection; the
/// scrape worker and every reader open their own.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {:?}", dir))?;
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Reader connection for request handlers; never writes or creates the file.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open {:?} read-only", path))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS notices (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                sequence_number INTEGER NOT NULL,
                title           TEXT NOT NULL,
                author          TEXT NOT NULL,
                published_date  TEXT NOT NULL,
                view_count      INTEGER NOT NULL,
                link            TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Swap the whole snapshot for `rows` in one transaction.
    ///
    /// The transaction rolls back when dropped uncommitted, so any failing
    /// statement leaves the previous snapshot in place.
    pub fn replace_all(&mut self, rows: &[NoticeRow]) -> rusqlite::Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM notices", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO notices
                 (sequence_number, title, author, published_date, view_count, link)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for r in rows {
                stmt.execute(rusqlite::params![
                    r.sequence_number, r.title, r.author, r.published_date, r.view_count, r.link,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Every notice in the current snapshot. Order is unspecified.
    pub fn read_all(&self) -> rusqlite::Result<Vec<Notice>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sequence_number, title, author, published_date, view_count, link
             FROM notices",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Notice {
                    id: row.get(0)?,
                    row: NoticeRow {
                        sequence_number: row.get(1)?,
                        title: row.get(2)?,
                        author: row.get(3)?,
                        published_date: row.get(4)?,
                        view_count: row.get(5)?,
                        link: row.get(6)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
