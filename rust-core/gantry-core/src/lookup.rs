//! # Pronunciation Lookup
//!
//! Handlers over a `cantonese (id, charCN, pronounce)` table and a directory
//! of `<pronounce>.mp3` clips. Every answer is `200` with an envelope
//! `{"code": 0|1, "message": .., "data": ..}`; `code` 1 means the lookup
//! failed and `data` is `null`.
//!
//! Handlers are synchronous, so the store carries a runtime [`Handle`] and
//! blocks on the pool. They must run on a blocking thread (the server runs
//! every request under `spawn_blocking`).

use crate::context::Context;
use crate::database::{DatabasePool, DbRow, DbValue};
use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::warn;

/// One dictionary row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cantonese {
    /// Row id
    pub id: i64,
    /// The character
    #[serde(rename = "charCN")]
    pub char_cn: String,
    /// Jyutping pronunciation
    pub pronounce: String,
}

impl Cantonese {
    fn from_row(row: &DbRow) -> Option<Self> {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| row.get(*k).and_then(DbValue::as_str))
                .unwrap_or_default()
                .to_string()
        };
        Some(Self {
            id: row.get("id").and_then(DbValue::as_i64)?,
            char_cn: text(&["charCN", "charcn"]),
            pronounce: text(&["pronounce"]),
        })
    }
}

/// Response envelope shared by every lookup handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupResponse<T> {
    /// 0 on success, 1 on failure
    pub code: i32,
    /// Human-readable outcome
    pub message: String,
    /// Payload, `null` on failure
    pub data: Option<T>,
}

impl<T> LookupResponse<T> {
    fn ok(operation: &str, data: T) -> Self {
        Self {
            code: 0,
            message: format!("{operation} succeeded"),
            data: Some(data),
        }
    }

    fn failed(operation: &str) -> Self {
        Self {
            code: 1,
            message: format!("{operation} failed"),
            data: None,
        }
    }

    /// True for `code == 0`
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Database pool, runtime handle and clip directory, acquired once at startup
#[derive(Debug, Clone)]
pub struct PronunciationStore {
    pool: DatabasePool,
    runtime: Handle,
    mp3_dir: PathBuf,
    mp3_url_prefix: String,
}

impl PronunciationStore {
    /// Store over `pool`, blocking on `runtime` for queries
    ///
    /// Clips default to `./static/mp3`, served under `assets/mp3`.
    #[must_use]
    pub fn new(pool: DatabasePool, runtime: Handle) -> Self {
        Self {
            pool,
            runtime,
            mp3_dir: PathBuf::from("./static/mp3"),
            mp3_url_prefix: "assets/mp3".to_string(),
        }
    }

    /// Look for clips in `dir` and report them under `url_prefix`
    #[must_use]
    pub fn with_mp3_dir(mut self, dir: impl AsRef<Path>, url_prefix: impl Into<String>) -> Self {
        self.mp3_dir = dir.as_ref().to_path_buf();
        self.mp3_url_prefix = url_prefix.into().trim_end_matches('/').to_string();
        self
    }

    fn marker(&self) -> &'static str {
        match self.pool {
            DatabasePool::Sqlite(_) => "?",
            DatabasePool::Postgres(_) => "$1",
        }
    }

    fn query_one(&self, sql: &str, arg: DbValue) -> Result<Option<DbRow>> {
        self.runtime
            .block_on(self.pool.fetch_optional_with(sql, &[arg]))
    }

    fn query_all(&self, sql: &str, arg: DbValue) -> Result<Vec<DbRow>> {
        self.runtime.block_on(self.pool.fetch_all_with(sql, &[arg]))
    }

    /// Row with the given id (`raw_id` as received in the query string)
    #[must_use]
    pub fn one_by_id(&self, raw_id: &str) -> LookupResponse<Cantonese> {
        const OP: &str = "find_one_by_id";
        let Ok(id) = raw_id.trim().parse::<i64>() else {
            return LookupResponse::failed(OP);
        };
        let sql = format!(
            "SELECT id, charCN, pronounce FROM cantonese WHERE id = {}",
            self.marker()
        );
        match self.query_one(&sql, DbValue::Int(id)) {
            Ok(Some(row)) => Cantonese::from_row(&row)
                .map_or_else(|| LookupResponse::failed(OP), |c| LookupResponse::ok(OP, c)),
            Ok(None) => LookupResponse::failed(OP),
            Err(err) => {
                warn!(operation = OP, error = %err, "Lookup query failed");
                LookupResponse::failed(OP)
            }
        }
    }

    /// First pronunciation recorded for a character
    #[must_use]
    pub fn pronounce_by_char(&self, char_cn: &str) -> LookupResponse<String> {
        const OP: &str = "find_pronounce_by_char";
        let sql = format!(
            "SELECT id, pronounce FROM cantonese WHERE charCN = {} ORDER BY id",
            self.marker()
        );
        match self.query_one(&sql, char_cn.into()) {
            Ok(Some(row)) => match row.get("pronounce").and_then(DbValue::as_str) {
                Some(p) => LookupResponse::ok(OP, p.to_string()),
                None => LookupResponse::failed(OP),
            },
            Ok(None) => LookupResponse::failed(OP),
            Err(err) => {
                warn!(operation = OP, error = %err, "Lookup query failed");
                LookupResponse::failed(OP)
            }
        }
    }

    /// Every row for a character; an unknown character gives an empty list
    #[must_use]
    pub fn all_by_char(&self, char_cn: &str) -> LookupResponse<Vec<Cantonese>> {
        const OP: &str = "find_all_by_char";
        let sql = format!(
            "SELECT id, charCN, pronounce FROM cantonese WHERE charCN = {} ORDER BY id",
            self.marker()
        );
        match self.query_all(&sql, char_cn.into()) {
            Ok(rows) => LookupResponse::ok(OP, rows.iter().filter_map(Cantonese::from_row).collect()),
            Err(err) => {
                warn!(operation = OP, error = %err, "Lookup query failed");
                LookupResponse::failed(OP)
            }
        }
    }

    /// Public path of the clip for a pronunciation, if the file exists
    #[must_use]
    pub fn mp3_for_pronounce(&self, pronounce: &str) -> LookupResponse<String> {
        const OP: &str = "find_mp3_for_pronounce";
        let safe = !pronounce.is_empty()
            && !pronounce.contains(['/', '\\'])
            && !pronounce.contains("..");
        if !safe {
            return LookupResponse::failed(OP);
        }
        let file = format!("{pronounce}.mp3");
        if self.mp3_dir.join(&file).is_file() {
            LookupResponse::ok(OP, format!("{}/{file}", self.mp3_url_prefix))
        } else {
            LookupResponse::failed(OP)
        }
    }
}

/// `GET ?id=`: one row by id
pub fn find_one_by_id(store: Arc<PronunciationStore>) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    move |ctx: &mut Context<'_>| {
        let resp = store.one_by_id(ctx.query("id"));
        ctx.json(200, &resp);
    }
}

/// `GET ?charCN=`: first pronunciation of a character
pub fn find_pronounce_by_char(
    store: Arc<PronunciationStore>,
) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    move |ctx: &mut Context<'_>| {
        let resp = store.pronounce_by_char(ctx.query("charCN"));
        ctx.json(200, &resp);
    }
}

/// `GET ?charCN=`: every row for a character
pub fn find_all_by_char(store: Arc<PronunciationStore>) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    move |ctx: &mut Context<'_>| {
        let resp = store.all_by_char(ctx.query("charCN"));
        ctx.json(200, &resp);
    }
}

/// `GET ?pronounce=`: public path of the matching clip
pub fn find_mp3_for_pronounce(
    store: Arc<PronunciationStore>,
) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    move |ctx: &mut Context<'_>| {
        let resp = store.mp3_for_pronounce(ctx.query("pronounce"));
        ctx.json(200, &resp);
    }
}

/// Middleware form of [`find_pronounce_by_char`]
///
/// Writes the same JSON and also stores the [`LookupResponse<String>`] in
/// the request state for later handlers. The pipeline continues afterwards.
pub fn pronounce_middleware(
    store: Arc<PronunciationStore>,
) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    move |ctx: &mut Context<'_>| {
        let resp = store.pronounce_by_char(ctx.query("charCN"));
        ctx.json(200, &resp);
        ctx.set_value(resp);
    }
}
