//! Step 2: clone components across the auto-generated-key boundary.
//!
//! Destination ids are assigned by the database, so the clone cannot carry
//! parent references on insert. The algorithm is two-phase: insert every
//! component with a null parent, read the destination page back to correlate
//! rows by comp_name, then patch each parent reference through the resulting
//! old-id to new-id mapping. comp_name must be unique within a page; a
//! duplicate silently collapses two source components onto one new id.

use crate::db::Database;
use crate::db::session::SessionUpdate;
use crate::error::{CloneError, CloneResult};
use crate::sql::{build_bulk_insert, InsertRecord};
use crate::tokens::substitute_opt;
use crate::types::{CloneSession, CloneStep, ComponentsResult, IdMapping, StagedComponent};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub fn clone_components(
    db: &Database,
    session: &CloneSession,
    actor: &str,
) -> CloneResult<ComponentsResult> {
    info!(session_id = %session.session_id, "cloning components");

    let hierarchy = session
        .template_hierarchy
        .as_ref()
        .ok_or_else(CloneError::hierarchy_not_loaded)?;

    let target_page_name = session
        .metadata
        .as_ref()
        .map(|m| m.target_page_name.as_str())
        .ok_or_else(|| CloneError::missing_field("metadata.targetPageName"))?;

    info!(
        target_page = target_page_name,
        target_id = session.target_id,
        "cloning into target page"
    );

    // First pass: insert records without ids, parent references nulled.
    // comp_name rides along as the correlation key.
    let records: Vec<InsertRecord> = hierarchy
        .iter()
        .map(|comp| {
            let mut record = InsertRecord::new();
            record.insert("page_id".into(), Value::from(session.target_id));
            record.insert("parent_id".into(), Value::Null);
            record.insert("comp_name".into(), Value::from(comp.comp_name.clone()));
            record.insert("comp_type".into(), Value::from(comp.comp_type.clone()));
            record.insert(
                "title".into(),
                substitute_opt(comp.title.as_deref(), target_page_name)
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            );
            record.insert(
                "description".into(),
                substitute_opt(comp.description.as_deref(), target_page_name)
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            );
            record.insert(
                "pos_order".into(),
                comp.pos_order.clone().map(Value::from).unwrap_or(Value::Null),
            );
            record.insert(
                "style".into(),
                comp.style.clone().map(Value::from).unwrap_or(Value::Null),
            );
            record
        })
        .collect();

    let insert_sql = build_bulk_insert("component_xref", &records)?;
    let committed = db.execute(&insert_sql)?;
    info!(committed, "committed components to component_xref");

    // Read back to obtain database-assigned ids, keyed by comp_name.
    let lookup_rows = db.query_rows(&format!(
        "SELECT id, comp_name FROM component_xref
         WHERE page_id = {} AND active = 1",
        session.target_id
    ))?;

    let mut name_to_new_id: HashMap<String, i64> = HashMap::new();
    for row in &lookup_rows {
        let id = row.get("id").and_then(Value::as_i64).unwrap_or(0);
        let comp_name = row
            .get("comp_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        name_to_new_id.insert(comp_name, id);
    }

    if name_to_new_id.len() < hierarchy.len() {
        warn!(
            distinct = name_to_new_id.len(),
            components = hierarchy.len(),
            "duplicate comp_name within page; correlation collapsed components"
        );
    }

    // Canonical old-id to new-id mapping.
    let mut id_mapping = IdMapping::new();
    for comp in hierarchy {
        let new_id = *name_to_new_id
            .get(&comp.comp_name)
            .ok_or_else(|| CloneError::correlation_failed(&comp.comp_name))?;
        id_mapping.insert(comp.id, new_id);
        debug!(old_id = comp.id, new_id, comp_name = %comp.comp_name, "id mapping");
    }

    // Second pass: wire parent references. The page root keeps its self-loop.
    for comp in hierarchy {
        let new_id = name_to_new_id[&comp.comp_name];
        let new_parent_id = if comp.parent_id == comp.id {
            new_id
        } else {
            *id_mapping
                .get(&comp.parent_id)
                .ok_or_else(|| CloneError::correlation_failed(&comp.comp_name))?
        };

        db.execute(&format!(
            "UPDATE component_xref SET parent_id = {} WHERE id = {}",
            new_parent_id, new_id
        ))?;
        debug!(comp_name = %comp.comp_name, new_id, new_parent_id, "updated parent_id");
    }

    info!(components = hierarchy.len(), "updated parent_id references");

    let staged_components: Vec<StagedComponent> = lookup_rows
        .iter()
        .map(|row| StagedComponent {
            id: row.get("id").and_then(Value::as_i64).unwrap_or(0),
            comp_name: row
                .get("comp_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            page_id: session.target_id,
        })
        .collect();

    db.update_session(
        &session.session_id,
        SessionUpdate {
            current_step: Some(CloneStep::Components),
            id_mapping: Some(id_mapping.clone()),
            staged_components: Some(staged_components.clone()),
            components_committed: Some(true),
            ..Default::default()
        },
        actor,
    )?;

    Ok(ComponentsResult {
        component_count: staged_components.len(),
        committed,
        id_mapping,
        staged_components,
    })
}
