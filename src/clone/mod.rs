//! Clone workflow orchestration.
//!
//! Drives the step sequence against one session:
//! init -> hierarchy -> components -> {props, eventSQL in either order}
//! -> triggers -> commit. Steps only advance, and a step that already
//! committed may not rerun; triggers require both props and eventSQL to
//! have committed (trigger payloads reference query names).

pub mod components;
pub mod eventsql;
pub mod hierarchy;
pub mod props;
pub mod triggers;

use crate::config::CloneConfig;
use crate::db::{now_ms, Database};
use crate::db::session::SessionUpdate;
use crate::error::{CloneError, CloneResult, ErrorCode};
use crate::types::{CloneSession, CloneStep, CommitResult, SessionStatus, SessionStatusRow, SessionSummary, StepOutcome};
use tracing::info;

/// The clone engine: a database handle plus workflow configuration.
#[derive(Clone)]
pub struct CloneEngine {
    db: Database,
    config: CloneConfig,
}

impl CloneEngine {
    pub fn new(db: Database, config: CloneConfig) -> Self {
        Self { db, config }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Create a new session for a template/target pair.
    pub fn start_session(&self, template_id: i64, target_id: i64) -> CloneResult<String> {
        self.db
            .create_session(template_id, target_id, &self.config.actor)
    }

    /// Run one workflow step against an existing session.
    pub fn run_step(&self, session_id: &str, step: CloneStep) -> CloneResult<StepOutcome> {
        let session = self.db.load_session(session_id)?;
        self.ensure_step_allowed(&session, step)?;

        let identity = &self.config.identity;
        let actor = &self.config.actor;

        let outcome = match step {
            CloneStep::Init => {
                return Err(CloneError::new(
                    ErrorCode::InvalidFieldValue,
                    "init is not a runnable step",
                )
                .with_field("step"));
            }
            CloneStep::Hierarchy => StepOutcome::Hierarchy(hierarchy::load_hierarchy(
                &self.db, &session, identity, actor,
            )?),
            CloneStep::Components => {
                StepOutcome::Components(components::clone_components(&self.db, &session, actor)?)
            }
            CloneStep::Props => {
                StepOutcome::Props(props::clone_props(&self.db, &session, identity, actor)?)
            }
            CloneStep::EventSql => StepOutcome::EventSql(eventsql::clone_event_sql(
                &self.db, &session, identity, actor,
            )?),
            CloneStep::Triggers => StepOutcome::Triggers(triggers::clone_triggers(
                &self.db, &session, identity, actor,
            )?),
        };

        info!(session_id, step = step.as_str(), "step completed");
        Ok(outcome)
    }

    /// Finalize a session. Flips status and stamps committed_at; the per-step
    /// data writes already happened eagerly, so this is a status marker, not
    /// a transaction boundary.
    pub fn commit(&self, session_id: &str) -> CloneResult<CommitResult> {
        let session = self.db.load_session(session_id)?;

        if session.status == SessionStatus::Committed {
            return Err(CloneError::already_committed(session_id));
        }
        if session.status != SessionStatus::ReadyToCommit
            || session.current_step != CloneStep::Triggers
        {
            return Err(CloneError::new(
                ErrorCode::NotReadyToCommit,
                format!(
                    "Session {} is at step '{}' with status '{}'; all staging steps must complete before commit",
                    session_id,
                    session.current_step.as_str(),
                    session.status.as_str()
                ),
            ));
        }

        let committed_at = now_ms();
        self.db.update_session(
            session_id,
            SessionUpdate {
                status: Some(SessionStatus::Committed),
                committed_at: Some(committed_at),
                ..Default::default()
            },
            &self.config.actor,
        )?;

        info!(session_id, "session committed");
        Ok(CommitResult {
            session_id: session_id.to_string(),
            committed_at,
        })
    }

    /// Session status lookup.
    pub fn status(&self, session_id: &str) -> CloneResult<Option<SessionStatusRow>> {
        self.db.get_session_status(session_id)
    }

    /// List recent active sessions.
    pub fn list(&self) -> CloneResult<Vec<SessionSummary>> {
        self.db.list_sessions(self.config.list_limit)
    }

    /// Soft delete a session (administrative action).
    pub fn soft_delete(&self, session_id: &str) -> CloneResult<()> {
        self.db.soft_delete_session(session_id, &self.config.actor)
    }

    /// Step-order guard. A step below the session's current rank would
    /// regress the workflow; a step that already committed has nothing to
    /// resume and may not rerun; triggers require committed props and
    /// eventSQL steps; no step runs once the session is committed.
    fn ensure_step_allowed(&self, session: &CloneSession, step: CloneStep) -> CloneResult<()> {
        if session.status == SessionStatus::Committed {
            return Err(CloneError::already_committed(&session.session_id));
        }

        if step.rank() < session.current_step.rank() {
            return Err(CloneError::step_out_of_order(
                step.as_str(),
                session.current_step.as_str(),
            ));
        }

        // Rerunning a committed step would duplicate its inserts on the
        // target page; resumption only re-enters steps that never committed.
        let already_committed = match step {
            CloneStep::Components => session.components_committed,
            CloneStep::Props => session.props_committed,
            CloneStep::EventSql => session.eventsql_committed,
            CloneStep::Triggers => session.triggers_committed,
            CloneStep::Init | CloneStep::Hierarchy => false,
        };
        if already_committed {
            return Err(CloneError::new(
                ErrorCode::StepOutOfOrder,
                format!(
                    "Step '{}' has already committed for this session",
                    step.as_str()
                ),
            ));
        }

        match step {
            CloneStep::Components if session.template_hierarchy.is_none() => {
                Err(CloneError::hierarchy_not_loaded())
            }
            CloneStep::Props | CloneStep::EventSql if session.id_mapping.is_empty() => {
                Err(CloneError::mapping_not_built())
            }
            CloneStep::Triggers if !session.props_committed => Err(CloneError::new(
                ErrorCode::StepOutOfOrder,
                "Triggers may not run before props have committed",
            )),
            CloneStep::Triggers if !session.eventsql_committed => Err(CloneError::new(
                ErrorCode::StepOutOfOrder,
                "Triggers may not run before eventSQL has committed; trigger payloads reference query names",
            )),
            _ => Ok(()),
        }
    }
}
