//! Per-identity context parameter store.
//!
//! Named queries reference `:param` placeholders that resolve against the
//! acting identity's context_store rows, e.g. the "current page" id.

use super::{now_ms, Database};
use anyhow::Result;
use rusqlite::params;

impl Database {
    /// Set (or replace) a context parameter for an identity.
    pub fn set_context(&self, identity: &str, name: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO context_store (user_email, param_name, param_val, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_email, param_name)
                 DO UPDATE SET param_val = excluded.param_val, updated_at = excluded.updated_at",
                params![identity, name, value, now_ms()],
            )?;
            Ok(())
        })
    }

    /// Read a context parameter for an identity.
    pub fn get_context(&self, identity: &str, name: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT param_val FROM context_store
                 WHERE user_email = ?1 AND param_name = ?2",
                params![identity, name],
                |row| row.get::<_, Option<String>>(0),
            );

            match result {
                Ok(value) => Ok(value),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }
}
