//! Bidirectional value marshalling between the host and the Lua VM.
//!
//! The host value model is `serde_json::Value`. Lua tables with a non-empty
//! dense 1-indexed prefix marshal as sequences; all other tables marshal as
//! string-keyed mappings.

use mlua::{Lua, Table, Value};
use serde_json::Value as Json;

/// Convert a Lua value into a host value.
///
/// Unrepresentable values (functions, userdata, threads) become null.
#[must_use]
pub fn lua_to_json(value: &Value) -> Json {
    match value {
        Value::String(s) => Json::String(lossy(s)),
        Value::Integer(i) => Json::from(*i),
        Value::Number(n) => number_to_json(*n),
        Value::Boolean(b) => Json::Bool(*b),
        Value::Table(t) => table_to_json(t),
        _ => Json::Null,
    }
}

fn table_to_json(table: &Table) -> Json {
    let len = table.raw_len();
    if len > 0 {
        let items = (1..=len)
            .map(|i| {
                table
                    .raw_get::<Value>(i)
                    .map(|v| lua_to_json(&v))
                    .unwrap_or(Json::Null)
            })
            .collect();
        return Json::Array(items);
    }

    let mut map = serde_json::Map::new();
    for pair in table.clone().pairs::<Value, Value>() {
        let Ok((key, value)) = pair else { continue };
        map.insert(key_to_string(&key), lua_to_json(&value));
    }
    Json::Object(map)
}

/// Generic stringification for mapping keys.
fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => lossy(s),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => format!("{}", n),
        Value::Boolean(b) => b.to_string(),
        _ => "null".to_string(),
    }
}

/// Integral floats fold back to JSON integers so the encoding matches the
/// VM's number model (a float-valued 5 encodes as `5`, not `5.0`).
fn number_to_json(n: f64) -> Json {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
}

fn lossy(s: &mlua::String) -> String {
    String::from_utf8_lossy(&s.as_bytes()).into_owned()
}

/// Push a host value into the VM.
///
/// Objects become fresh tables, sequences become tables indexed from 1,
/// i64-representable numbers become Lua integers, everything else the
/// corresponding scalar.
///
/// # Errors
///
/// Returns an error if the VM fails to allocate a table or string.
pub fn json_to_lua(lua: &Lua, value: &Json) -> mlua::Result<Value> {
    Ok(match value {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::Boolean(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Number(n.as_f64().unwrap_or_default()),
        },
        Json::String(s) => Value::String(lua.create_string(s)?),
        Json::Array(items) => {
            let table = lua.create_table()?;
            for (i, item) in items.iter().enumerate() {
                table.raw_set(i + 1, json_to_lua(lua, item)?)?;
            }
            Value::Table(table)
        }
        Json::Object(map) => {
            let table = lua.create_table()?;
            for (key, item) in map {
                table.raw_set(key.as_str(), json_to_lua(lua, item)?)?;
            }
            Value::Table(table)
        }
    })
}
