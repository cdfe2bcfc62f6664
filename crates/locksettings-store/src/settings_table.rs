//! Per-user key/value settings table
//!
//! Values are stored as strings in `locksettings(name, user, value)`. A
//! write deletes any existing row for the same `(name, user)` and inserts
//! the new one inside a single transaction, so a pair never has more than
//! one live row.

use crate::models::{SettingValue, UserId};
use crate::{Database, Result};
use rusqlite::{params, OptionalExtension, Transaction};

/// Settings table operations
pub struct SettingsTable<'a> {
    db: &'a Database,
}

impl<'a> SettingsTable<'a> {
    /// Create settings table accessor
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Replace the value of `key` for `user_id`
    pub fn write(&self, key: &str, value: &SettingValue, user_id: UserId) -> Result<()> {
        let stored = value.to_stored();
        self.db.write(|tx| Self::write_tx(tx, key, &stored, user_id))
    }

    /// Replace a value within an existing transaction
    pub fn write_tx(tx: &Transaction<'_>, key: &str, value: &str, user_id: UserId) -> Result<()> {
        tx.execute(
            "DELETE FROM locksettings WHERE name = ?1 AND user = ?2",
            params![key, user_id],
        )?;
        tx.execute(
            "INSERT INTO locksettings (name, user, value) VALUES (?1, ?2, ?3)",
            params![key, user_id, value],
        )?;
        Ok(())
    }

    /// Write a string value
    pub fn set_string(&self, key: &str, value: &str, user_id: UserId) -> Result<()> {
        self.write(key, &SettingValue::Str(value.to_string()), user_id)
    }

    /// Write a boolean value
    pub fn set_bool(&self, key: &str, value: bool, user_id: UserId) -> Result<()> {
        self.write(key, &SettingValue::Bool(value), user_id)
    }

    /// Write an integer value
    pub fn set_long(&self, key: &str, value: i64, user_id: UserId) -> Result<()> {
        self.write(key, &SettingValue::Long(value), user_id)
    }

    /// Raw stored value, if any row exists
    pub fn read(&self, key: &str, user_id: UserId) -> Result<Option<String>> {
        self.db.read(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM locksettings WHERE user = ?1 AND name = ?2 LIMIT 1",
                    params![user_id, key],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?;
            Ok(value.flatten())
        })
    }

    /// Stored non-empty value, if any
    fn read_non_empty(&self, key: &str, user_id: UserId) -> Result<Option<String>> {
        Ok(self.read(key, user_id)?.filter(|v| !v.is_empty()))
    }

    /// String value or `default` when absent or empty
    pub fn get_string(&self, key: &str, default: Option<&str>, user_id: UserId) -> Result<Option<String>> {
        Ok(self
            .read_non_empty(key, user_id)?
            .or_else(|| default.map(str::to_string)))
    }

    /// Boolean value or `default` when absent or empty
    pub fn get_bool(&self, key: &str, default: bool, user_id: UserId) -> Result<bool> {
        Ok(self
            .read_non_empty(key, user_id)?
            .map(|v| SettingValue::parse_bool(&v))
            .unwrap_or(default))
    }

    /// Integer value or `default` when absent, empty or not a number
    pub fn get_long(&self, key: &str, default: i64, user_id: UserId) -> Result<i64> {
        let Some(stored) = self.read_non_empty(key, user_id)? else {
            return Ok(default);
        };
        match SettingValue::parse_long(&stored) {
            Some(v) => Ok(v),
            None => {
                tracing::warn!(key, user_id, "Stored setting is not an integer, using default");
                Ok(default)
            }
        }
    }

    /// Number of rows stored for `(key, user_id)`
    pub fn row_count(&self, key: &str, user_id: UserId) -> Result<u64> {
        self.db.read(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM locksettings WHERE user = ?1 AND name = ?2",
                params![user_id, key],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// All `(key, value)` pairs of a user, ordered by key
    pub fn entries(&self, user_id: UserId) -> Result<Vec<(String, String)>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, COALESCE(value, '') FROM locksettings WHERE user = ?1 ORDER BY name",
            )?;
            let rows = stmt
                .query_map([user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<(String, String)>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete every row of `user_id` in one transaction
    pub fn delete_user(&self, user_id: UserId) -> Result<usize> {
        self.db.write(|tx| Self::delete_user_tx(tx, user_id))
    }

    /// Delete every row of `user_id` within an existing transaction
    pub fn delete_user_tx(tx: &Transaction<'_>, user_id: UserId) -> Result<usize> {
        Ok(tx.execute("DELETE FROM locksettings WHERE user = ?1", [user_id])?)
    }
}
