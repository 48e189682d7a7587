//! Step 3: clone component properties.

use crate::db::Database;
use crate::db::session::SessionUpdate;
use crate::error::{CloneError, CloneResult};
use crate::sql::{build_bulk_insert, InsertRecord};
use crate::tokens::substitute_opt;
use crate::types::{CloneSession, CloneStep, PropsResult, SkippedItem, StagedProp};
use serde_json::Value;
use tracing::{info, warn};

pub fn clone_props(
    db: &Database,
    session: &CloneSession,
    identity: &str,
    actor: &str,
) -> CloneResult<PropsResult> {
    info!(
        session_id = %session.session_id,
        template_id = session.template_id,
        "cloning props"
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

    let rows = db.resolve_named_query(identity, "pageProps")?;

    if rows.is_empty() {
        info!("no props found for template");
        db.update_session(
            &session.session_id,
            SessionUpdate {
                current_step: Some(CloneStep::Props),
                staged_props: Some(Vec::new()),
                props_committed: Some(true),
                ..Default::default()
            },
            actor,
        )?;
        return Ok(PropsResult {
            props_count: 0,
            committed: 0,
            staged_props: Vec::new(),
            skipped: Vec::new(),
        });
    }

    info!(props = rows.len(), "loaded props from template");

    let mut staged_props = Vec::new();
    let mut skipped = Vec::new();

    for row in &rows {
        let old_xref_id = row.get("xref_id").and_then(Value::as_i64).unwrap_or(0);

        let Some(&new_xref_id) = id_mapping.get(&old_xref_id) else {
            warn!(old_xref_id, "no ID mapping found for xref_id, skipping prop");
            skipped.push(SkippedItem {
                xref_id: old_xref_id,
                reason: "no id_mapping entry for originating component".into(),
            });
            continue;
        };

        staged_props.push(StagedProp {
            xref_id: new_xref_id,
            param_name: row
                .get("param_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            param_val: substitute_opt(
                row.get("param_val").and_then(Value::as_str),
                target_page_name,
            ),
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

    info!(staged = staged_props.len(), "staged props");

    // comp_name/comp_type stay on the staged snapshot only.
    let mut committed = 0;
    if !staged_props.is_empty() {
        let records: Vec<InsertRecord> = staged_props
            .iter()
            .map(|prop| {
                let mut record = InsertRecord::new();
                record.insert("xref_id".into(), Value::from(prop.xref_id));
                record.insert("param_name".into(), Value::from(prop.param_name.clone()));
                record.insert(
                    "param_val".into(),
                    prop.param_val.clone().map(Value::from).unwrap_or(Value::Null),
                );
                record
            })
            .collect();

        let sql = build_bulk_insert("component_props", &records)?;
        committed = db.execute(&sql)?;
        info!(committed, "committed props to component_props");
    }

    db.update_session(
        &session.session_id,
        SessionUpdate {
            current_step: Some(CloneStep::Props),
            staged_props: Some(staged_props.clone()),
            props_committed: Some(true),
            ..Default::default()
        },
        actor,
    )?;

    Ok(PropsResult {
        props_count: staged_props.len(),
        committed,
        staged_props,
        skipped,
    })
}
