//! Sanctioned query surface over the pool
//!
//! Every helper checks a connection out, runs exactly one statement (or one
//! atomic batch), and releases the connection before the result or error
//! reaches the caller. Release rides on the checkout guard's drop, so it
//! also happens when the calling future is cancelled mid-query.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::decode::decode_row;
use crate::pool::ConnectionPool;
use crate::{Error, Result};

/// A decoded result row: column name → JSON value, in SELECT order.
pub type SqlRow = IndexMap<String, JsonValue>;

/// Result returned from write statements (INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInfo {
   /// The number of rows affected by the statement.
   pub rows_affected: u64,

   /// The last inserted ROWID.
   ///
   /// Only meaningful after an INSERT into a table with a ROWID; tables
   /// created `WITHOUT ROWID` leave this at 0.
   pub last_insert_rowid: i64,
}

impl ConnectionPool {
   /// Run a SELECT and return every matching row.
   pub async fn fetch_all(&self, query: &str, values: Vec<JsonValue>) -> Result<Vec<SqlRow>> {
      let mut conn = self.acquire().await?;

      let result = async {
         let mut q = sqlx::query(query);
         for value in values {
            q = bind_value(q, value);
         }
         let rows = q.fetch_all(&mut *conn).await?;
         rows.iter().map(decode_row).collect()
      }
      .await;

      // Release before the result (or error) propagates
      drop(conn);
      result
   }

   /// Run a SELECT expected to match at most one row.
   ///
   /// Returns the first matching row, or `None` when nothing matched.
   pub async fn fetch_one(&self, query: &str, values: Vec<JsonValue>) -> Result<Option<SqlRow>> {
      let mut conn = self.acquire().await?;

      let result = async {
         let mut q = sqlx::query(query);
         for value in values {
            q = bind_value(q, value);
         }
         let row = q.fetch_optional(&mut *conn).await?;
         row.as_ref().map(decode_row).transpose()
      }
      .await;

      drop(conn);
      result
   }

   /// Run a single write statement (INSERT, UPDATE, DELETE, DDL).
   pub async fn execute(&self, query: &str, values: Vec<JsonValue>) -> Result<ChangeInfo> {
      let mut conn = self.acquire().await?;

      let result = async {
         let mut q = sqlx::query(query);
         for value in values {
            q = bind_value(q, value);
         }
         let outcome = q.execute(&mut *conn).await?;
         Ok(ChangeInfo {
            rows_affected: outcome.rows_affected(),
            last_insert_rowid: outcome.last_insert_rowid(),
         })
      }
      .await;

      drop(conn);
      result
   }

   /// Execute multiple write statements atomically on one connection.
   ///
   /// This method:
   /// 1. Begins a transaction (BEGIN IMMEDIATE)
   /// 2. Executes all statements in order
   /// 3. Commits on success (COMMIT)
   /// 4. Rolls back on any error (ROLLBACK)
   ///
   /// The connection is held for the entire batch, ensuring atomicity.
   /// Returns the result of each statement execution.
   pub async fn execute_batch(
      &self,
      statements: Vec<(String, Vec<JsonValue>)>,
   ) -> Result<Vec<ChangeInfo>> {
      let mut conn = self.acquire().await?;

      sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

      let result = async {
         let mut results = Vec::new();
         for (query, values) in statements {
            let mut q = sqlx::query(&query);
            for value in values {
               q = bind_value(q, value);
            }
            let outcome = q.execute(&mut *conn).await?;
            results.push(ChangeInfo {
               rows_affected: outcome.rows_affected(),
               last_insert_rowid: outcome.last_insert_rowid(),
            });
         }
         Ok::<Vec<ChangeInfo>, Error>(results)
      }
      .await;

      match result {
         Ok(results) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(results)
         }
         Err(e) => {
            match sqlx::query("ROLLBACK").execute(&mut *conn).await {
               // Rollback succeeded, return the original error
               Ok(_) => Err(e),

               // Rollback also failed; report both
               Err(rollback_err) => Err(Error::BatchRollbackFailed {
                  batch_error: e.to_string(),
                  rollback_error: rollback_err.to_string(),
               }),
            }
         }
      }
   }
}

/// Bind a JSON value to a sqlx query, preserving integer precision where
/// possible.
fn bind_value<'a>(
   query: sqlx::query::Query<'a, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'a>>,
   value: JsonValue,
) -> sqlx::query::Query<'a, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'a>> {
   match value {
      JsonValue::Null => query.bind(None::<JsonValue>),
      JsonValue::Bool(flag) => query.bind(flag),
      JsonValue::String(text) => query.bind(text),
      JsonValue::Number(number) => {
         if let Some(int_val) = number.as_i64() {
            query.bind(int_val)
         } else if let Some(uint_val) = number.as_u64() {
            // Too large for SQLite's INTEGER; accept the f64 precision loss
            query.bind(uint_val as f64)
         } else {
            query.bind(number.as_f64().unwrap_or_default())
         }
      }
      other => query.bind(other),
   }
}
