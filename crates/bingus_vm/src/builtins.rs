//! Host-side builtin implementations.
//!
//! Each builtin is a plain host function in one of the bridge's adapter
//! shapes; the capability registry decides which of them a given VM sees.

use crate::bridge::{HostError, HostResult};
use chrono::Utc;
use serde_json::{json, Value as Json};
use std::time::Duration;

/// Total timeout on outbound HTTP, covering connect through body read.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// --- time ---

/// `time.now()` — current UTC wall clock as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn time_now() -> HostResult {
    Ok(Json::String(
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    ))
}

/// `time.unix()` — whole seconds since the Unix epoch.
pub fn time_unix() -> HostResult {
    Ok(Json::from(Utc::now().timestamp()))
}

// --- json ---

/// `json.encode(value)` — serialise any marshallable value.
pub fn json_encode(value: Json) -> HostResult {
    serde_json::to_string(&value)
        .map(Json::String)
        .map_err(HostError::Encode)
}

/// `json.decode(s)` — parse a JSON document.
pub fn json_decode(s: String) -> HostResult {
    serde_json::from_str(&s).map_err(HostError::Decode)
}

// --- http ---

/// `http.get(url)` — returns `{status, body}`. Transport errors do not
/// raise: they come back as `{status = 0, body = <error text>}` so scripts
/// can branch on `status`.
pub fn http_get(url: String) -> HostResult {
    let response = client().and_then(|c| c.get(&url).send());
    Ok(match response {
        Ok(resp) => {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            json!({"status": status, "body": body})
        }
        Err(err) => json!({"status": 0, "body": err.to_string()}),
    })
}

/// `http.post(url, body, content_type)` — same shape and error convention
/// as `http.get`. An empty content type defaults to `application/json`.
pub fn http_post(url: String, body: String, content_type: String) -> HostResult {
    let content_type = if content_type.is_empty() {
        "application/json".to_string()
    } else {
        content_type
    };
    let response = client().and_then(|c| {
        c.post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
    });
    Ok(match response {
        Ok(resp) => {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            json!({"status": status, "body": body})
        }
        Err(err) => json!({"status": 0, "body": err.to_string()}),
    })
}

fn client() -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
}

// --- fs ---

/// `fs.read(path)` — file contents as a string.
pub fn fs_read(path: String) -> HostResult {
    Ok(Json::String(std::fs::read_to_string(path)?))
}

/// `fs.write(path, content)` — write a file with mode 0644, returns `true`.
pub fn fs_write(path: String, content: String) -> HostResult {
    use std::io::Write;

    let mut opts = std::fs::OpenOptions::new();
    opts.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o644);
    }
    opts.open(path)?.write_all(content.as_bytes())?;
    Ok(Json::Bool(true))
}

/// `fs.list(path)` — directory entries as `{name, is_dir}` records.
pub fn fs_list(path: String) -> HostResult {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        entries.push(json!({
            "name": entry.file_name().to_string_lossy(),
            "is_dir": entry.file_type()?.is_dir(),
        }));
    }
    Ok(Json::Array(entries))
}
