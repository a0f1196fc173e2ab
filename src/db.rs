//! SQLite persistence for the desktop positioning service.
//!
//! Holds two single-row tables: the last position fix (with the place names
//! the IP provider reported alongside it) and the user's permission answer.

use crate::error::PlatformError;
use crate::models::Coordinates;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// A fix as persisted by [`PositionCache::store_fix`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFix {
    pub coords: Coordinates,
    pub recorded_at: DateTime<Utc>,
    pub city: String,
    pub region: String,
    pub country: String,
}

pub struct PositionCache {
    conn: Mutex<Connection>,
}

impl PositionCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PlatformError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, PlatformError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PlatformError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS last_fix (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                recorded_at INTEGER NOT NULL,
                city TEXT NOT NULL DEFAULT '',
                region TEXT NOT NULL DEFAULT '',
                country TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS permission (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                granted INTEGER NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-statement;
        // SQLite itself is still consistent.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn store_fix(&self, fix: &StoredFix) -> Result<(), PlatformError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO last_fix (id, latitude, longitude, recorded_at, city, region, country)
             VALUES (1, ?, ?, ?, ?, ?, ?)",
            params![
                fix.coords.latitude,
                fix.coords.longitude,
                fix.recorded_at.timestamp_millis(),
                fix.city,
                fix.region,
                fix.country,
            ],
        )?;
        Ok(())
    }

    pub fn last_fix(&self) -> Result<Option<StoredFix>, PlatformError> {
        let row = self
            .conn()
            .query_row(
                "SELECT latitude, longitude, recorded_at, city, region, country FROM last_fix WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.and_then(|(lat, lon, millis, city, region, country)| {
            // Rows with an unrepresentable timestamp are treated as absent.
            let recorded_at = Utc.timestamp_millis_opt(millis).single()?;
            Some(StoredFix {
                coords: Coordinates::new(lat, lon),
                recorded_at,
                city,
                region,
                country,
            })
        }))
    }

    pub fn store_permission(&self, granted: bool) -> Result<(), PlatformError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO permission (id, granted) VALUES (1, ?)",
            params![granted],
        )?;
        Ok(())
    }

    pub fn permission(&self) -> Result<Option<bool>, PlatformError> {
        let granted = self
            .conn()
            .query_row("SELECT granted FROM permission WHERE id = 1", [], |row| {
                row.get::<_, bool>(0)
            })
            .optional()?;
        Ok(granted)
    }
}
