// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named polling cursors.

use murmur_core::MurmurError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::timestamp;

pub async fn load_cursor(db: &Database, name: &str) -> Result<Option<String>, MurmurError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM cursors WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn save_cursor(db: &Database, name: &str, value: &str) -> Result<(), MurmurError> {
    let name = name.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO cursors (name, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![name, value, timestamp::now()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn clear_cursor(db: &Database, name: &str) -> Result<(), MurmurError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM cursors WHERE name = ?1", params![name])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
