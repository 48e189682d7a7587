//! Step 1: load the template page's component tree.

use crate::db::Database;
use crate::db::session::SessionUpdate;
use crate::error::{CloneError, CloneResult, ErrorCode};
use crate::types::{CloneSession, CloneStep, HierarchyResult, TemplateComponent};
use serde_json::Value;
use tracing::info;

/// Fetch the template hierarchy through the `pageHierarchy` named query and
/// persist it on the session.
pub fn load_hierarchy(
    db: &Database,
    session: &CloneSession,
    identity: &str,
    actor: &str,
) -> CloneResult<HierarchyResult> {
    info!(
        session_id = %session.session_id,
        template_id = session.template_id,
        "loading template hierarchy"
    );

    db.set_context(identity, "pageID", &session.template_id.to_string())?;

    let rows = db.resolve_named_query(identity, "pageHierarchy")?;

    if rows.is_empty() {
        return Err(CloneError::new(
            ErrorCode::TemplateEmpty,
            format!(
                "No components found for template page {}",
                session.template_id
            ),
        ));
    }

    let hierarchy: Vec<TemplateComponent> = rows
        .into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)))
        .collect::<Result<_, _>>()?;

    info!(components = hierarchy.len(), "loaded template hierarchy");

    db.update_session(
        &session.session_id,
        SessionUpdate {
            current_step: Some(CloneStep::Hierarchy),
            template_hierarchy: Some(hierarchy.clone()),
            ..Default::default()
        },
        actor,
    )?;

    Ok(HierarchyResult {
        component_count: hierarchy.len(),
    })
}
