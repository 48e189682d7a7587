//! Step 5: clone event triggers.
//!
//! Runs last among the staging steps: trigger payloads are structured data
//! that may reference query-definition names, so the eventSQL step must have
//! committed first. The orchestrator enforces the ordering.

use crate::db::Database;
use crate::db::session::SessionUpdate;
use crate::error::{CloneError, CloneResult};
use crate::sql::{build_bulk_insert, InsertRecord};
use crate::tokens::substitute_deep;
use crate::types::{CloneSession, CloneStep, SessionStatus, SkippedItem, StagedTrigger, TriggersResult};
use serde_json::Value;
use tracing::{info, warn};

pub fn clone_triggers(
    db: &Database,
    session: &CloneSession,
    identity: &str,
    actor: &str,
) -> CloneResult<TriggersResult> {
    info!(
        session_id = %session.session_id,
        template_id = session.template_id,
        "cloning triggers"
    );

    if session.template_hierarchy.is_none() {
        return Err(CloneError::hierarchy_not_loaded());
    }
    if session.id_mapping.is_empty() {
        return Err(CloneError::mapping_not_built());
    }

    let id_mapping = &session.id_mapping;
    let target_page_name = session
        .metadata
        .as_ref()
        .map(|m| m.target_page_name.as_str())
        .ok_or_else(|| CloneError::missing_field("metadata.targetPageName"))?;

    db.set_context(identity, "pageID", &session.template_id.to_string())?;

    let rows = db.resolve_named_query(identity, "pageTriggers")?;

    if rows.is_empty() {
        info!("no triggers found for template");
        db.update_session(
            &session.session_id,
            SessionUpdate {
                current_step: Some(CloneStep::Triggers),
                staged_triggers: Some(Vec::new()),
                triggers_committed: Some(true),
                status: Some(SessionStatus::ReadyToCommit),
                ..Default::default()
            },
            actor,
        )?;
        return Ok(TriggersResult {
            triggers_count: 0,
            committed: 0,
            staged_triggers: Vec::new(),
            skipped: Vec::new(),
        });
    }

    info!(triggers = rows.len(), "loaded triggers from template");

    let mut staged_triggers = Vec::new();
    let mut skipped = Vec::new();

    for row in &rows {
        let old_xref_id = row.get("xref_id").and_then(Value::as_i64).unwrap_or(0);

        let Some(&new_xref_id) = id_mapping.get(&old_xref_id) else {
            warn!(old_xref_id, "no ID mapping found for xref_id, skipping trigger");
            skipped.push(SkippedItem {
                xref_id: old_xref_id,
                reason: "no id_mapping entry for originating component".into(),
            });
            continue;
        };

        let content = row.get("content").cloned().unwrap_or(Value::Null);

        staged_triggers.push(StagedTrigger {
            xref_id: new_xref_id,
            class: row
                .get("class")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            action: row
                .get("action")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            ordr: row.get("ordr").and_then(Value::as_i64).unwrap_or(1),
            content: substitute_deep(&content, target_page_name),
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

    info!(staged = staged_triggers.len(), "staged triggers");

    let mut committed = 0;
    if !staged_triggers.is_empty() {
        let records: Vec<InsertRecord> = staged_triggers
            .iter()
            .map(|trigger| {
                let mut record = InsertRecord::new();
                record.insert("xref_id".into(), Value::from(trigger.xref_id));
                record.insert("class".into(), Value::from(trigger.class.clone()));
                record.insert("action".into(), Value::from(trigger.action.clone()));
                record.insert("ordr".into(), Value::from(trigger.ordr));
                record.insert("content".into(), trigger.content.clone());
                record
            })
            .collect();

        let sql = build_bulk_insert("component_triggers", &records)?;
        committed = db.execute(&sql)?;
        info!(committed, "committed triggers to component_triggers");
    }

    db.update_session(
        &session.session_id,
        SessionUpdate {
            current_step: Some(CloneStep::Triggers),
            staged_triggers: Some(staged_triggers.clone()),
            triggers_committed: Some(true),
            status: Some(SessionStatus::ReadyToCommit),
            ..Default::default()
        },
        actor,
    )?;

    Ok(TriggersResult {
        triggers_count: staged_triggers.len(),
        committed,
        staged_triggers,
        skipped,
    })
}
