//! Step 4: clone named query definitions.
//!
//! Must run before the triggers step: trigger payloads reference query names
//! by value, and cloning triggers first would bake in stale names. The SQL
//! body is never copied; it is page-specific and set to an authoring
//! placeholder for the new page.

use crate::db::Database;
use crate::db::session::SessionUpdate;
use crate::error::{CloneError, CloneResult};
use crate::sql::{build_bulk_insert, InsertRecord};
use crate::tokens::substitute;
use crate::types::{CloneSession, CloneStep, EventSqlResult, SkippedItem, StagedEventSql};
use serde_json::Value;
use tracing::{info, warn};

/// Placeholder body for cloned query definitions, pending manual authoring.
pub const PENDING_SQL: &str = "Create SQL";

pub fn clone_event_sql(
    db: &Database,
    session: &CloneSession,
    identity: &str,
    actor: &str,
) -> CloneResult<EventSqlResult> {
    info!(
        session_id = %session.session_id,
        template_id = session.template_id,
        "cloning eventSQL"
    );

    let target_page_name = session
        .metadata
        .as_ref()
        .map(|m| m.target_page_name.as_str())
        .ok_or_else(|| CloneError::missing_field("metadata.targetPageName"))?;
    let target_app_name = session
        .metadata
        .as_ref()
        .map(|m| m.target_app_name.as_str())
        .unwrap_or("unknown");

    if session.id_mapping.is_empty() {
        return Err(CloneError::mapping_not_built());
    }
    let id_mapping = &session.id_mapping;

    db.set_context(identity, "pageID", &session.template_id.to_string())?;

    let rows = db.resolve_named_query(identity, "pageSQL")?;

    if rows.is_empty() {
        info!("no eventSQL found for template");
        db.update_session(
            &session.session_id,
            SessionUpdate {
                current_step: Some(CloneStep::EventSql),
                staged_eventsql: Some(Vec::new()),
                eventsql_committed: Some(true),
                ..Default::default()
            },
            actor,
        )?;
        return Ok(EventSqlResult {
            eventsql_count: 0,
            committed: 0,
            staged_eventsql: Vec::new(),
            skipped: Vec::new(),
        });
    }

    info!(eventsql = rows.len(), "loaded eventSQL from template");

    let mut staged_eventsql = Vec::new();
    let mut skipped = Vec::new();

    for row in &rows {
        let old_xref_id = row.get("xref_id").and_then(Value::as_i64).unwrap_or(0);

        let Some(&new_xref_id) = id_mapping.get(&old_xref_id) else {
            warn!(old_xref_id, "no ID mapping found for xref_id, skipping eventSQL");
            skipped.push(SkippedItem {
                xref_id: old_xref_id,
                reason: "no id_mapping entry for originating component".into(),
            });
            continue;
        };

        staged_eventsql.push(StagedEventSql {
            grp: target_app_name.to_string(),
            qry_name: substitute(
                row.get("qry_name").and_then(Value::as_str).unwrap_or_default(),
                target_page_name,
            ),
            qry_sql: PENDING_SQL.to_string(),
            xref_id: new_xref_id,
            comp_name: row
                .get("comp_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            comp_type: row
                .get("comp_type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    info!(staged = staged_eventsql.len(), "staged eventSQL queries");

    // Audit fields (xref_id, comp_name, comp_type) stay on the staged
    // snapshot; the event_sql insert carries only grp, qry_name, qry_sql.
    let mut committed = 0;
    if !staged_eventsql.is_empty() {
        let records: Vec<InsertRecord> = staged_eventsql
            .iter()
            .map(|sql| {
                let mut record = InsertRecord::new();
                record.insert("grp".into(), Value::from(sql.grp.clone()));
                record.insert("qry_name".into(), Value::from(sql.qry_name.clone()));
                record.insert("qry_sql".into(), Value::from(sql.qry_sql.clone()));
                record
            })
            .collect();

        let insert_sql = build_bulk_insert("event_sql", &records)?;
        committed = db.execute(&insert_sql)?;
        info!(committed, "committed eventSQL queries to event_sql");
    }

    db.update_session(
        &session.session_id,
        SessionUpdate {
            current_step: Some(CloneStep::EventSql),
            staged_eventsql: Some(staged_eventsql.clone()),
            eventsql_committed: Some(true),
            ..Default::default()
        },
        actor,
    )?;

    Ok(EventSqlResult {
        eventsql_count: staged_eventsql.len(),
        committed,
        staged_eventsql,
        skipped,
    })
}
