//! Core types for the Template Cloning Engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Workflow step of a clone session. Steps only advance forward; props and
/// eventSQL share a rank and may run in either order, but triggers always
/// follow eventSQL because trigger payloads reference query names by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloneStep {
    Init,
    Hierarchy,
    Components,
    Props,
    #[serde(rename = "eventSQL")]
    EventSql,
    Triggers,
}

impl CloneStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloneStep::Init => "init",
            CloneStep::Hierarchy => "hierarchy",
            CloneStep::Components => "components",
            CloneStep::Props => "props",
            CloneStep::EventSql => "eventSQL",
            CloneStep::Triggers => "triggers",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "init" => Some(CloneStep::Init),
            "hierarchy" => Some(CloneStep::Hierarchy),
            "components" => Some(CloneStep::Components),
            "props" => Some(CloneStep::Props),
            "eventSQL" => Some(CloneStep::EventSql),
            "triggers" => Some(CloneStep::Triggers),
            _ => None,
        }
    }

    /// Ordering rank. Props and eventSQL are interchangeable.
    pub fn rank(&self) -> u8 {
        match self {
            CloneStep::Init => 0,
            CloneStep::Hierarchy => 1,
            CloneStep::Components => 2,
            CloneStep::Props | CloneStep::EventSql => 3,
            CloneStep::Triggers => 4,
        }
    }
}

/// Lifecycle status of a clone session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    ReadyToCommit,
    Committed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::ReadyToCommit => "ready_to_commit",
            SessionStatus::Committed => "committed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(SessionStatus::InProgress),
            "ready_to_commit" => Some(SessionStatus::ReadyToCommit),
            "committed" => Some(SessionStatus::Committed),
            _ => None,
        }
    }
}

/// Session metadata resolved once at creation from page_registry.
/// Never supplied by the caller, so token substitution always targets the
/// true destination page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub target_page_name: String,
    pub target_app_name: String,
}

/// A component row from the template page hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateComponent {
    pub id: i64,
    /// Equals `id` for the page root.
    pub parent_id: i64,
    pub comp_name: String,
    pub comp_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pos_order: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

/// Lightweight component snapshot persisted on the session after commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedComponent {
    pub id: i64,
    pub comp_name: String,
    pub page_id: i64,
}

/// Property staged for the target page. comp_name/comp_type are retained on
/// the snapshot for audit but never inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedProp {
    pub xref_id: i64,
    pub param_name: String,
    pub param_val: Option<String>,
    pub comp_name: String,
    pub comp_type: String,
}

/// Trigger staged for the target page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedTrigger {
    pub xref_id: i64,
    pub class: String,
    pub action: String,
    pub ordr: i64,
    pub content: serde_json::Value,
    pub comp_name: String,
    pub comp_type: String,
}

/// Query definition staged for the target page. The SQL body is always the
/// authoring placeholder; template SQL is page-specific and never copied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedEventSql {
    pub grp: String,
    pub qry_name: String,
    pub qry_sql: String,
    pub xref_id: i64,
    pub comp_name: String,
    pub comp_type: String,
}

/// Map from source component id to the database-assigned destination id.
pub type IdMapping = HashMap<i64, i64>;

/// A durable clone session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneSession {
    pub session_id: String,
    pub template_id: i64,
    pub target_id: i64,
    pub current_step: CloneStep,
    pub status: SessionStatus,
    pub metadata: Option<SessionMetadata>,
    pub template_hierarchy: Option<Vec<TemplateComponent>>,
    pub id_mapping: IdMapping,
    pub staged_components: Vec<StagedComponent>,
    pub staged_props: Vec<StagedProp>,
    pub staged_triggers: Vec<StagedTrigger>,
    pub staged_eventsql: Vec<StagedEventSql>,
    pub components_committed: bool,
    pub props_committed: bool,
    pub eventsql_committed: bool,
    pub triggers_committed: bool,
    pub error_message: Option<String>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: i64,
    pub committed_at: Option<i64>,
    pub deleted_at: Option<i64>,
    pub deleted_by: Option<String>,
    pub active: bool,
}

/// Compact session representation for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub template_id: i64,
    pub target_id: i64,
    pub current_step: CloneStep,
    pub status: SessionStatus,
    pub created_at: i64,
    pub created_by: String,
}

/// Status snapshot for a single session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusRow {
    pub session_id: String,
    pub current_step: CloneStep,
    pub status: SessionStatus,
    pub error_message: Option<String>,
}

/// An item dropped during a clone step because its originating component has
/// no entry in the id mapping. Surfaced on the step result so callers see
/// partial failures instead of a log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    pub xref_id: i64,
    pub reason: String,
}

/// Result of the hierarchy step.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyResult {
    pub component_count: usize,
}

/// Result of the components step.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentsResult {
    pub component_count: usize,
    pub committed: usize,
    pub id_mapping: IdMapping,
    pub staged_components: Vec<StagedComponent>,
}

/// Result of the props step.
#[derive(Debug, Clone, Serialize)]
pub struct PropsResult {
    pub props_count: usize,
    pub committed: usize,
    pub staged_props: Vec<StagedProp>,
    pub skipped: Vec<SkippedItem>,
}

/// Result of the eventSQL step.
#[derive(Debug, Clone, Serialize)]
pub struct EventSqlResult {
    pub eventsql_count: usize,
    pub committed: usize,
    pub staged_eventsql: Vec<StagedEventSql>,
    pub skipped: Vec<SkippedItem>,
}

/// Result of the triggers step.
#[derive(Debug, Clone, Serialize)]
pub struct TriggersResult {
    pub triggers_count: usize,
    pub committed: usize,
    pub staged_triggers: Vec<StagedTrigger>,
    pub skipped: Vec<SkippedItem>,
}

/// Result of finalizing a session.
#[derive(Debug, Clone, Serialize)]
pub struct CommitResult {
    pub session_id: String,
    pub committed_at: i64,
}

/// Outcome of running one workflow step through the orchestrator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum StepOutcome {
    Hierarchy(HierarchyResult),
    Components(ComponentsResult),
    Props(PropsResult),
    #[serde(rename = "eventSQL")]
    EventSql(EventSqlResult),
    Triggers(TriggersResult),
}
