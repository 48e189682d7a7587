//! Clone session CRUD.
//!
//! The clone_session table is the workflow's durable state: one row per
//! cloning operation, mutated by each step and finalized once by commit.

use super::{now_ms, Database};
use crate::error::{CloneError, CloneResult};
use crate::types::{
    CloneSession, CloneStep, IdMapping, SessionMetadata, SessionStatus, SessionStatusRow,
    SessionSummary, StagedComponent, StagedEventSql, StagedProp, StagedTrigger,
    TemplateComponent,
};
use chrono::Utc;
use rusqlite::{params, Row as SqlRow};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

/// Partial update of a session row. Fields left as None are untouched; the
/// struct itself is the whitelist of writable columns.
#[derive(Debug, Default)]
pub struct SessionUpdate {
    pub current_step: Option<CloneStep>,
    pub status: Option<SessionStatus>,
    pub template_hierarchy: Option<Vec<TemplateComponent>>,
    pub id_mapping: Option<IdMapping>,
    pub staged_components: Option<Vec<StagedComponent>>,
    pub staged_props: Option<Vec<StagedProp>>,
    pub staged_triggers: Option<Vec<StagedTrigger>>,
    pub staged_eventsql: Option<Vec<StagedEventSql>>,
    pub components_committed: Option<bool>,
    pub props_committed: Option<bool>,
    pub eventsql_committed: Option<bool>,
    pub triggers_committed: Option<bool>,
    pub error_message: Option<String>,
    pub committed_at: Option<i64>,
}

fn parse_json_column<T: DeserializeOwned + Default>(raw: Option<String>) -> T {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn parse_session_row(row: &SqlRow) -> rusqlite::Result<CloneSession> {
    let current_step: String = row.get("current_step")?;
    let status: String = row.get("status")?;
    let metadata: Option<String> = row.get("metadata")?;
    let template_hierarchy: Option<String> = row.get("template_hierarchy")?;
    let id_mapping: Option<String> = row.get("id_mapping")?;
    let staged_components: Option<String> = row.get("staged_components")?;
    let staged_props: Option<String> = row.get("staged_props")?;
    let staged_triggers: Option<String> = row.get("staged_triggers")?;
    let staged_eventsql: Option<String> = row.get("staged_eventsql")?;

    Ok(CloneSession {
        session_id: row.get("session_id")?,
        template_id: row.get("template_id")?,
        target_id: row.get("target_id")?,
        current_step: CloneStep::from_str(&current_step).unwrap_or(CloneStep::Init),
        status: SessionStatus::from_str(&status).unwrap_or(SessionStatus::InProgress),
        metadata: metadata.and_then(|s| serde_json::from_str::<SessionMetadata>(&s).ok()),
        template_hierarchy: template_hierarchy
            .and_then(|s| serde_json::from_str::<Vec<TemplateComponent>>(&s).ok()),
        id_mapping: parse_json_column(id_mapping),
        staged_components: parse_json_column(staged_components),
        staged_props: parse_json_column(staged_props),
        staged_triggers: parse_json_column(staged_triggers),
        staged_eventsql: parse_json_column(staged_eventsql),
        components_committed: row.get::<_, i64>("components_committed")? != 0,
        props_committed: row.get::<_, i64>("props_committed")? != 0,
        eventsql_committed: row.get::<_, i64>("eventsql_committed")? != 0,
        triggers_committed: row.get::<_, i64>("triggers_committed")? != 0,
        error_message: row.get("error_message")?,
        created_by: row.get("created_by")?,
        updated_by: row.get("updated_by")?,
        created_at: row.get("created_at")?,
        committed_at: row.get("committed_at")?,
        deleted_at: row.get("deleted_at")?,
        deleted_by: row.get("deleted_by")?,
        active: row.get::<_, i64>("active")? != 0,
    })
}

impl Database {
    /// Create a new clone session.
    ///
    /// The target page's real name and owning app come from page_registry,
    /// never from the caller; the session id derives from that name plus a
    /// creation timestamp.
    pub fn create_session(
        &self,
        template_id: i64,
        target_id: i64,
        created_by: &str,
    ) -> CloneResult<String> {
        let page = self
            .get_page(target_id)?
            .ok_or_else(|| CloneError::page_not_found(target_id))?;

        let timestamp = Utc::now().format("%Y-%m-%d-%H%M");
        let session_id = format!("{}-{}", page.page_name, timestamp);

        let metadata = SessionMetadata {
            target_page_name: page.page_name,
            target_app_name: page.app_name.clone(),
        };
        let metadata_json = serde_json::to_string(&metadata)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO clone_session
                 (session_id, template_id, target_id, current_step, status, metadata, created_by, created_at)
                 VALUES (?1, ?2, ?3, 'init', 'in_progress', ?4, ?5, ?6)",
                params![
                    &session_id,
                    template_id,
                    target_id,
                    &metadata_json,
                    created_by,
                    now_ms(),
                ],
            )?;
            Ok(())
        })?;

        info!(
            session_id = %session_id,
            target_app = %page.app_name,
            "created clone session"
        );
        Ok(session_id)
    }

    /// Load an active session and deserialize all structured columns.
    pub fn load_session(&self, session_id: &str) -> CloneResult<CloneSession> {
        let result = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM clone_session WHERE session_id = ?1 AND active = 1",
            )?;

            match stmt.query_row(params![session_id], parse_session_row) {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })?;

        result.ok_or_else(|| CloneError::session_not_found(session_id))
    }

    /// Apply a partial update and stamp updated_by. Returns the affected row
    /// count; zero rows is logged as a warning, not an error, and callers
    /// must surface it.
    pub fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
        updated_by: &str,
    ) -> CloneResult<usize> {
        let mut fields: Vec<(&str, Box<dyn rusqlite::ToSql>)> = Vec::new();

        if let Some(step) = update.current_step {
            fields.push(("current_step", Box::new(step.as_str())));
        }
        if let Some(status) = update.status {
            fields.push(("status", Box::new(status.as_str())));
        }
        if let Some(hierarchy) = &update.template_hierarchy {
            fields.push(("template_hierarchy", Box::new(serde_json::to_string(hierarchy)?)));
        }
        if let Some(mapping) = &update.id_mapping {
            fields.push(("id_mapping", Box::new(serde_json::to_string(mapping)?)));
        }
        if let Some(components) = &update.staged_components {
            fields.push(("staged_components", Box::new(serde_json::to_string(components)?)));
        }
        if let Some(props) = &update.staged_props {
            fields.push(("staged_props", Box::new(serde_json::to_string(props)?)));
        }
        if let Some(triggers) = &update.staged_triggers {
            fields.push(("staged_triggers", Box::new(serde_json::to_string(triggers)?)));
        }
        if let Some(eventsql) = &update.staged_eventsql {
            fields.push(("staged_eventsql", Box::new(serde_json::to_string(eventsql)?)));
        }
        if let Some(flag) = update.components_committed {
            fields.push(("components_committed", Box::new(flag as i64)));
        }
        if let Some(flag) = update.props_committed {
            fields.push(("props_committed", Box::new(flag as i64)));
        }
        if let Some(flag) = update.eventsql_committed {
            fields.push(("eventsql_committed", Box::new(flag as i64)));
        }
        if let Some(flag) = update.triggers_committed {
            fields.push(("triggers_committed", Box::new(flag as i64)));
        }
        if let Some(message) = &update.error_message {
            fields.push(("error_message", Box::new(message.clone())));
        }
        if let Some(committed_at) = update.committed_at {
            fields.push(("committed_at", Box::new(committed_at)));
        }

        if fields.is_empty() {
            warn!(session_id, "no fields to update for session");
            return Ok(0);
        }

        fields.push(("updated_by", Box::new(updated_by.to_string())));

        let set_clauses: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect();

        let sql = format!(
            "UPDATE clone_session SET {} WHERE session_id = ?{}",
            set_clauses.join(", "),
            fields.len() + 1
        );

        let mut values: Vec<Box<dyn rusqlite::ToSql>> =
            fields.into_iter().map(|(_, v)| v).collect();
        values.push(Box::new(session_id.to_string()));

        let affected = self.with_conn(|conn| {
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                values.iter().map(|b| b.as_ref()).collect();
            let affected = conn.execute(&sql, params_refs.as_slice())?;
            Ok(affected)
        })?;

        if affected == 0 {
            warn!(session_id, "no rows updated for session");
        }

        Ok(affected)
    }

    /// Current step, status, and error message for one session.
    pub fn get_session_status(&self, session_id: &str) -> CloneResult<Option<SessionStatusRow>> {
        let result = self.with_conn(|conn| {
            let query = conn.query_row(
                "SELECT session_id, current_step, status, error_message
                 FROM clone_session
                 WHERE session_id = ?1 AND active = 1",
                params![session_id],
                |row| {
                    let step: String = row.get(1)?;
                    let status: String = row.get(2)?;
                    Ok(SessionStatusRow {
                        session_id: row.get(0)?,
                        current_step: CloneStep::from_str(&step).unwrap_or(CloneStep::Init),
                        status: SessionStatus::from_str(&status)
                            .unwrap_or(SessionStatus::InProgress),
                        error_message: row.get(3)?,
                    })
                },
            );

            match query {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })?;

        Ok(result)
    }

    /// List active sessions, most recent first.
    pub fn list_sessions(&self, limit: i64) -> CloneResult<Vec<SessionSummary>> {
        let sessions = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, template_id, target_id, current_step, status,
                        created_at, created_by
                 FROM clone_session
                 WHERE active = 1
                 ORDER BY created_at DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map(params![limit], |row| {
                    let step: String = row.get(3)?;
                    let status: String = row.get(4)?;
                    Ok(SessionSummary {
                        session_id: row.get(0)?,
                        template_id: row.get(1)?,
                        target_id: row.get(2)?,
                        current_step: CloneStep::from_str(&step).unwrap_or(CloneStep::Init),
                        status: SessionStatus::from_str(&status)
                            .unwrap_or(SessionStatus::InProgress),
                        created_at: row.get(5)?,
                        created_by: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })?;

        Ok(sessions)
    }

    /// Soft delete a session. The clone engine never hard-deletes.
    pub fn soft_delete_session(&self, session_id: &str, deleted_by: &str) -> CloneResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE clone_session
                 SET deleted_at = ?1, deleted_by = ?2, active = 0
                 WHERE session_id = ?3",
                params![now_ms(), deleted_by, session_id],
            )?;
            Ok(())
        })?;

        info!(session_id, "soft deleted session");
        Ok(())
    }
}
