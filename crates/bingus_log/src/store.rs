//! Namespaced JSONL store.
//!
//! Layout: `<root>/<namespace>/YYYY-MM-DD.jsonl`, one JSON object per line,
//! newline-terminated. Appends go through `O_APPEND` so concurrent writers
//! interleave whole lines; queries are best-effort against concurrent
//! appends but never see a torn line.

use crate::since::parse_since;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Error from log store operations
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Append called with a non-object value
    #[error("log.append expects a table")]
    NotATable,

    /// No home directory could be resolved for the default root
    #[error("getting home dir: HOME is not set")]
    NoHome,

    /// The namespace directory could not be created
    #[error("creating log dir: {0}")]
    CreateDir(#[source] std::io::Error),

    /// A daily file could not be opened for append
    #[error("opening log file: {0}")]
    OpenFile(#[source] std::io::Error),

    /// The entry line could not be written
    #[error("writing entry: {0}")]
    WriteEntry(#[source] std::io::Error),

    /// An entry or result set could not be serialised
    #[error("encoding entry: {0}")]
    Encode(#[from] serde_json::Error),

    /// The `since` value matched neither a relative duration nor RFC3339
    #[error("invalid since value {value:?}: use \"24h\", \"7d\", or an RFC3339 timestamp")]
    InvalidSince {
        /// The rejected input
        value: String,
    },
}

/// Default log root: `<home>/.bingus/logs`.
///
/// # Errors
///
/// Returns [`LogError::NoHome`] when neither `HOME` nor `USERPROFILE` is set.
pub fn default_root() -> Result<PathBuf, LogError> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".bingus").join("logs"))
        .ok_or(LogError::NoHome)
}

/// Append/query handle for one log namespace.
///
/// The namespace doubles as the directory name; callers validate it against
/// the claim grammar before constructing a store.
pub struct LogStore {
    namespace: String,
    dir: PathBuf,
}

impl LogStore {
    /// Open (creating if needed) the directory for a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path, namespace: &str) -> Result<Self, LogError> {
        let dir = root.join(namespace);
        std::fs::create_dir_all(&dir).map_err(LogError::CreateDir)?;
        Ok(Self {
            namespace: namespace.to_string(),
            dir,
        })
    }

    /// The namespace this store is scoped to
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Append one entry to today's file.
    ///
    /// The reserved fields `id` (16-hex-char random) and `createdAt` (UTC
    /// milliseconds) are overwritten on the stored record regardless of what
    /// the caller supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or on I/O failure.
    pub fn append(&self, entry: Value) -> Result<String, LogError> {
        let Value::Object(mut entry) = entry else {
            return Err(LogError::NotATable);
        };

        let now = Utc::now();
        entry.insert("id".to_string(), Value::String(random_id()));
        entry.insert("createdAt".to_string(), now.timestamp_millis().into());

        let line = serde_json::to_string(&entry)?;
        let mut file = open_append(&self.day_file(now))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .map_err(LogError::WriteEntry)?;

        Ok(format!("Logged to {}", self.namespace))
    }

    /// Query entries at or after a cutoff, optionally filtered by text.
    ///
    /// `since` accepts `"24h"`-style hours, `"7d"`-style calendar days, an
    /// RFC3339 timestamp, or the empty string (24 hours). Text matching is
    /// case-insensitive over top-level string values and string elements of
    /// top-level sequences; nested objects are not searched.
    ///
    /// Returns the JSON encoding of the matching entries, or the literal
    /// string `null` when nothing matched.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparseable `since` value.
    pub fn query(&self, since: &str, text: &str) -> Result<String, LogError> {
        let now = Utc::now();
        let cutoff = parse_since(since, now)?;
        let cutoff_ms = cutoff.timestamp_millis();
        let text_lower = text.to_lowercase();

        let mut entries = Vec::new();
        let today = now.date_naive();
        let mut day = cutoff.date_naive();
        while day <= today {
            let path = self.dir.join(format!("{}.jsonl", day.format("%Y-%m-%d")));
            // Days with no activity simply have no file.
            if let Ok(file) = File::open(&path) {
                read_jsonl(file, cutoff_ms, &text_lower, &mut entries);
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        if entries.is_empty() {
            return Ok("null".to_string());
        }
        Ok(serde_json::to_string(&entries)?)
    }

    fn day_file(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir.join(format!("{}.jsonl", at.format("%Y-%m-%d")))
    }
}

fn open_append(path: &Path) -> Result<File, LogError> {
    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o644);
    }
    opts.open(path).map_err(LogError::OpenFile)
}

/// Collect entries from one daily file, skipping malformed lines and
/// entries older than the cutoff.
fn read_jsonl(file: File, cutoff_ms: i64, text_lower: &str, out: &mut Vec<Map<String, Value>>) {
    for line in BufReader::new(file).lines() {
        let Ok(line) = line else { return };
        let Ok(entry) = serde_json::from_str::<Map<String, Value>>(&line) else {
            continue;
        };
        if let Some(ts) = entry.get("createdAt").and_then(Value::as_f64) {
            if (ts as i64) < cutoff_ms {
                continue;
            }
        }
        if !text_lower.is_empty() && !entry_matches_text(&entry, text_lower) {
            continue;
        }
        out.push(entry);
    }
}

/// Depth-1 text search: top-level strings and string elements of top-level
/// arrays. Nested objects are deliberately not scanned.
fn entry_matches_text(entry: &Map<String, Value>, text_lower: &str) -> bool {
    entry.values().any(|value| match value {
        Value::String(s) => s.to_lowercase().contains(text_lower),
        Value::Array(items) => items
            .iter()
            .any(|item| matches!(item, Value::String(s) if s.to_lowercase().contains(text_lower))),
        _ => false,
    })
}

fn random_id() -> String {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
