//! # Snippet 数据模型
//!
//! 所有与 `snippets` 表相关的 SQL 都集中在这里。时间戳统一以 UTC 毫秒整数存储，
//! 读操作只返回 `expires > now` 的记录，过期数据不会被物理删除。

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_derive::Serialize;
use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};
use thiserror::Error;

/// `latest` 最多返回的记录数
pub const LATEST_LIMIT: i64 = 10;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS snippets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created INTEGER NOT NULL,
    expires INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_snippets_created ON snippets(created);
";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ModelError {
    /// 记录不存在或已经过期
    #[error("models: no matching record found")]
    NoRecord,
    #[error("models: invalid expiry of {0} days")]
    InvalidExpiry(i64),
    #[error("models: column {0} holds an out-of-range timestamp")]
    InvalidTimestamp(&'static str),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Snippet 的存取接口，处理器只依赖这个 trait。
#[cfg_attr(test, mockall::automock)]
pub trait SnippetStore: Send + Sync {
    /// 插入一条新记录，过期时间为当前时间加 `expires` 天，返回新记录的 id
    fn insert(&self, title: &str, content: &str, expires: i64) -> Result<i64, ModelError>;

    /// 按 id 查询未过期的记录，不存在或已过期返回 [`ModelError::NoRecord`]
    fn get(&self, id: i64) -> Result<Snippet, ModelError>;

    /// 最近创建的至多 10 条未过期记录，按创建时间倒序
    fn latest(&self) -> Result<Vec<Snippet>, ModelError>;
}

/// 当前时间的来源，测试中可以替换为可控的时钟
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// 基于 SQLite 的 [`SnippetStore`] 实现。
///
/// 单个连接由互斥锁保护，每次调用只执行一条语句。
pub struct SnippetModel {
    conn: Mutex<Connection>,
    clock: Clock,
}

impl SnippetModel {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("SQLite journal_mode: {}", mode);
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, ModelError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, ModelError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock: Box::new(Utc::now),
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("数据库连接锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }
}

type SnippetRow = (i64, String, String, i64, i64);

fn scan(row: &Row<'_>) -> rusqlite::Result<SnippetRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn to_snippet((id, title, content, created, expires): SnippetRow) -> Result<Snippet, ModelError> {
    Ok(Snippet {
        id,
        title,
        content,
        created: DateTime::from_timestamp_millis(created)
            .ok_or(ModelError::InvalidTimestamp("created"))?,
        expires: DateTime::from_timestamp_millis(expires)
            .ok_or(ModelError::InvalidTimestamp("expires"))?,
    })
}

impl SnippetStore for SnippetModel {
    fn insert(&self, title: &str, content: &str, expires: i64) -> Result<i64, ModelError> {
        let created = self.now();
        let expires_at = Duration::try_days(expires)
            .and_then(|days| created.checked_add_signed(days))
            .ok_or(ModelError::InvalidExpiry(expires))?;

        let conn = self.connection();
        conn.execute(
            "INSERT INTO snippets (title, content, created, expires) VALUES (?1, ?2, ?3, ?4)",
            params![
                title,
                content,
                created.timestamp_millis(),
                expires_at.timestamp_millis()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Snippet, ModelError> {
        let now = self.now().timestamp_millis();
        let row = self
            .connection()
            .query_row(
                "SELECT id, title, content, created, expires FROM snippets
                 WHERE expires > ?1 AND id = ?2",
                params![now, id],
                scan,
            )
            .optional()?;
        match row {
            Some(row) => to_snippet(row),
            None => Err(ModelError::NoRecord),
        }
    }

    fn latest(&self) -> Result<Vec<Snippet>, ModelError> {
        let now = self.now().timestamp_millis();
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT id, title, content, created, expires FROM snippets
             WHERE expires > ?1 ORDER BY created DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![now, LATEST_LIMIT], scan)?;

        let mut snippets = Vec::new();
        for row in rows {
            snippets.push(to_snippet(row?)?);
        }
        Ok(snippets)
    }
}
