//! Decoding SQLite rows into JSON values

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteRow, SqliteValueRef};
use sqlx::{Column, Decode, Row, Sqlite, TypeInfo, ValueRef};

use crate::{Error, Result, SqlRow};

/// Decode a full row into an ordered column-name → JSON map.
pub(crate) fn decode_row(row: &SqliteRow) -> Result<SqlRow> {
   let mut decoded = IndexMap::default();

   for (i, column) in row.columns().iter().enumerate() {
      let value = row.try_get_raw(i)?;
      decoded.insert(column.name().to_string(), to_json(value, column.name())?);
   }

   Ok(decoded)
}

/// Convert a single SQLite value to JSON.
///
/// BLOB columns come back base64-encoded, and BOOLEAN columns come back as
/// the 0/1 integers SQLite stores them as.
fn to_json(value: SqliteValueRef<'_>, column: &str) -> Result<JsonValue> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let type_name = value.type_info().name().to_string();

   let decoded = match type_name.as_str() {
      "TEXT" | "DATETIME" | "DATE" | "TIME" => {
         JsonValue::String(decode_as::<&str>(value, column)?.to_string())
      }
      "INTEGER" | "NUMERIC" => JsonValue::from(decode_as::<i64>(value, column)?),
      "BOOLEAN" => JsonValue::from(i64::from(decode_as::<bool>(value, column)?)),
      "REAL" => {
         let float = decode_as::<f64>(value, column)?;
         // SQLite stores NaN as NULL, so the fallback arm is unreachable in
         // practice.
         serde_json::Number::from_f64(float).map_or(JsonValue::Null, JsonValue::Number)
      }
      "BLOB" => JsonValue::String(BASE64.encode(decode_as::<&[u8]>(value, column)?)),
      other => return Err(Error::UnsupportedDatatype(other.to_string())),
   };

   Ok(decoded)
}

fn decode_as<'r, T: Decode<'r, Sqlite>>(value: SqliteValueRef<'r>, column: &str) -> Result<T> {
   T::decode(value).map_err(|e| Error::DecodeColumn {
      column: column.to_string(),
      message: e.to_string(),
   })
}
