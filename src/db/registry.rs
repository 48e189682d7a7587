//! Page registry lookups.

use super::{now_ms, Database};
use anyhow::Result;
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// A page's registry entry: the canonical page name and owning application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRegistryEntry {
    pub id: i64,
    pub app_name: String,
    pub page_name: String,
}

impl Database {
    /// Look up a page's canonical name and app. Returns None for unknown or
    /// inactive pages.
    pub fn get_page(&self, page_id: i64) -> Result<Option<PageRegistryEntry>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT id, app_name, page_name FROM page_registry
                 WHERE id = ?1 AND active = 1",
                params![page_id],
                |row| {
                    Ok(PageRegistryEntry {
                        id: row.get(0)?,
                        app_name: row.get(1)?,
                        page_name: row.get(2)?,
                    })
                },
            );

            match result {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Register a page. Registry maintenance belongs to the wider Studio; this
    /// exists for seeding and tests.
    pub fn register_page(&self, app_name: &str, page_name: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO page_registry (app_name, page_name, created_at) VALUES (?1, ?2, ?3)",
                params![app_name, page_name, now_ms()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }
}
