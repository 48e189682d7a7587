//! Named-query resolution.
//!
//! Query definitions live in the event_sql table. Resolution fetches the SQL
//! body by name, substitutes every `:param` placeholder from the acting
//! identity's context store, and executes the result. The clone engine reads
//! all template data this way instead of constructing ad hoc SQL.

use super::{Database, Row};
use crate::error::{CloneError, CloneResult};
use anyhow::Result;
use regex_lite::Regex;
use rusqlite::params;
use tracing::debug;

impl Database {
    /// Fetch the stored SQL body for a named query.
    pub fn fetch_event_sql(&self, qry_name: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT qry_sql FROM event_sql
                 WHERE qry_name = ?1 AND active = 1",
                params![qry_name],
                |row| row.get::<_, Option<String>>(0),
            );

            match result {
                Ok(sql) => Ok(sql),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Resolve a named query against an identity's context and execute it.
    ///
    /// Every `:param` must have a context_store entry for the identity;
    /// a missing parameter is an error rather than a broken statement.
    pub fn resolve_named_query(&self, identity: &str, qry_name: &str) -> CloneResult<Vec<Row>> {
        let sql = self
            .fetch_event_sql(qry_name)?
            .ok_or_else(|| CloneError::query_not_found(qry_name))?;

        debug!(qry_name, "resolving named query");

        let final_sql = self.resolve_context_params(identity, &sql)?;
        let rows = self.query_rows(&final_sql)?;

        debug!(qry_name, rows = rows.len(), "named query executed");
        Ok(rows)
    }

    /// Substitute `:name` placeholders from the context store.
    fn resolve_context_params(&self, identity: &str, sql: &str) -> CloneResult<String> {
        let param_re = Regex::new(r":([a-zA-Z_][a-zA-Z0-9_]*)").unwrap();

        // Longest names first so a shared prefix (:page vs :pageID) cannot
        // clobber a longer placeholder.
        let mut names: Vec<&str> = param_re
            .captures_iter(sql)
            .map(|c| c.get(1).unwrap().as_str())
            .collect();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        names.dedup();

        let mut final_sql = sql.to_string();
        for name in names {
            let value = self
                .get_context(identity, name)?
                .ok_or_else(|| CloneError::missing_context_param(name))?;

            debug!(param = name, value = %value, "resolved from context_store");
            final_sql = final_sql.replace(&format!(":{}", name), &sql_value(&value));
        }

        Ok(final_sql)
    }
}

/// Render a context value as a SQL literal: numerics pass through, everything
/// else is quoted with single quotes doubled.
fn sql_value(value: &str) -> String {
    if value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_context_values_pass_through() {
        assert_eq!(sql_value("42"), "42");
        assert_eq!(sql_value("-1.5"), "-1.5");
    }

    #[test]
    fn text_context_values_are_quoted_and_escaped() {
        assert_eq!(sql_value("ingrType"), "'ingrType'");
        assert_eq!(sql_value("o'clock"), "'o''clock'");
    }
}
