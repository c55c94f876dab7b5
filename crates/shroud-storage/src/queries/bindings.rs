// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binding table queries.
//!
//! The table name is configurable and interpolated into the SQL text, so
//! callers must pass a name that passed
//! [`is_sql_identifier`](shroud_config::validation::is_sql_identifier).
//! Every value is bound as a parameter.

use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use shroud_core::{AnonId, ExternalUserId, NewBinding, ShroudError, ThreadId, UserBinding};

use crate::database::{map_tr_err, Database};

/// Creates the binding table if it does not exist yet.
pub async fn ensure_table(db: &Database, table: &str) -> Result<(), ShroudError> {
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL UNIQUE,
            anon_id TEXT NOT NULL UNIQUE,
            thread_id INTEGER NOT NULL UNIQUE
        )"
    );
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Looks up the binding for an external user.
pub async fn find_by_user(
    db: &Database,
    table: &str,
    user_id: ExternalUserId,
) -> Result<Option<UserBinding>, ShroudError> {
    let sql = format!("SELECT id, user_id, anon_id, thread_id FROM {table} WHERE user_id = ?1");
    db.connection()
        .call(move |conn| -> Result<Option<UserBinding>, rusqlite::Error> {
            conn.query_row(&sql, params![user_id.0], row_to_binding)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Looks up the binding that owns a thread.
pub async fn find_by_thread(
    db: &Database,
    table: &str,
    thread_id: ThreadId,
) -> Result<Option<UserBinding>, ShroudError> {
    let sql = format!("SELECT id, user_id, anon_id, thread_id FROM {table} WHERE thread_id = ?1");
    db.connection()
        .call(move |conn| -> Result<Option<UserBinding>, rusqlite::Error> {
            conn.query_row(&sql, params![thread_id.0], row_to_binding)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Inserts a binding and returns it with the assigned sequence number.
///
/// Fails on any uniqueness violation; a binding is never overwritten.
pub async fn insert(
    db: &Database,
    table: &str,
    binding: &NewBinding,
) -> Result<UserBinding, ShroudError> {
    let sql = format!("INSERT INTO {table} (user_id, anon_id, thread_id) VALUES (?1, ?2, ?3)");
    let binding = *binding;
    db.connection()
        .call(move |conn| -> Result<UserBinding, rusqlite::Error> {
            conn.execute(
                &sql,
                params![
                    binding.user_id.0,
                    binding.anon_id.to_string(),
                    binding.thread_id.0
                ],
            )?;
            Ok(UserBinding {
                sequence: conn.last_insert_rowid(),
                user_id: binding.user_id,
                anon_id: binding.anon_id,
                thread_id: binding.thread_id,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Counts stored bindings.
pub async fn count(db: &Database, table: &str) -> Result<i64, ShroudError> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(&sql, [], |row| row.get(0))
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_binding(row: &Row<'_>) -> Result<UserBinding, rusqlite::Error> {
    let anon_raw: String = row.get(2)?;
    let anon_id = anon_raw
        .parse::<AnonId>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(UserBinding {
        sequence: row.get(0)?,
        user_id: ExternalUserId(row.get(1)?),
        anon_id,
        thread_id: ThreadId(row.get(3)?),
    })
}
