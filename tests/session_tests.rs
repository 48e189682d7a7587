//! Integration tests for the clone session store.

use studio_clone::db::session::SessionUpdate;
use studio_clone::db::Database;
use studio_clone::error::ErrorCode;
use studio_clone::types::{CloneStep, SessionStatus};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

mod open_tests {
    use super::*;

    #[test]
    fn open_creates_file_and_runs_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());

        // Schema is in place: registry insert succeeds.
        let page_id = db.register_page("whatsfresh", "ingrType").unwrap();
        assert!(page_id > 0);
    }
}

mod create_tests {
    use super::*;

    #[test]
    fn create_session_resolves_target_from_registry() {
        let db = setup_db();
        let template_id = db.register_page("whatsfresh", "crudTmplt").unwrap();
        let target_id = db.register_page("whatsfresh", "ingrType").unwrap();

        let session_id = db
            .create_session(template_id, target_id, "paul")
            .expect("Failed to create session");

        // Session id derives from the registry page name, not caller input.
        assert!(session_id.starts_with("ingrType-"));

        let session = db.load_session(&session_id).unwrap();
        assert_eq!(session.template_id, template_id);
        assert_eq!(session.target_id, target_id);
        assert_eq!(session.current_step, CloneStep::Init);
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.created_by, "paul");

        let metadata = session.metadata.expect("metadata resolved at creation");
        assert_eq!(metadata.target_page_name, "ingrType");
        assert_eq!(metadata.target_app_name, "whatsfresh");
    }

    #[test]
    fn create_session_rejects_unknown_target_page() {
        let db = setup_db();
        let template_id = db.register_page("whatsfresh", "crudTmplt").unwrap();

        let err = db.create_session(template_id, 999, "paul").unwrap_err();

        assert_eq!(err.code, ErrorCode::PageNotFound);
    }
}

mod load_tests {
    use super::*;

    #[test]
    fn load_session_fails_for_unknown_id() {
        let db = setup_db();

        let err = db.load_session("nope-2025-01-01-0000").unwrap_err();

        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }

    #[test]
    fn load_session_round_trips_structured_columns() {
        let db = setup_db();
        let template_id = db.register_page("whatsfresh", "crudTmplt").unwrap();
        let target_id = db.register_page("whatsfresh", "ingrType").unwrap();
        let session_id = db.create_session(template_id, target_id, "paul").unwrap();

        let mut mapping = std::collections::HashMap::new();
        mapping.insert(65, 103);
        mapping.insert(67, 105);

        db.update_session(
            &session_id,
            SessionUpdate {
                current_step: Some(CloneStep::Components),
                id_mapping: Some(mapping.clone()),
                components_committed: Some(true),
                ..Default::default()
            },
            "paul",
        )
        .unwrap();

        let session = db.load_session(&session_id).unwrap();

        assert_eq!(session.current_step, CloneStep::Components);
        assert_eq!(session.id_mapping, mapping);
        assert!(session.components_committed);
        assert_eq!(session.updated_by, Some("paul".to_string()));
    }
}

mod update_tests {
    use super::*;

    #[test]
    fn update_with_no_fields_touches_nothing() {
        let db = setup_db();
        let template_id = db.register_page("whatsfresh", "crudTmplt").unwrap();
        let target_id = db.register_page("whatsfresh", "ingrType").unwrap();
        let session_id = db.create_session(template_id, target_id, "paul").unwrap();

        let affected = db
            .update_session(&session_id, SessionUpdate::default(), "paul")
            .unwrap();

        assert_eq!(affected, 0);
    }

    #[test]
    fn update_unknown_session_reports_zero_rows() {
        let db = setup_db();

        // Zero affected rows is a caller-visible warning, not an error.
        let affected = db
            .update_session(
                "missing-2025-01-01-0000",
                SessionUpdate {
                    current_step: Some(CloneStep::Hierarchy),
                    ..Default::default()
                },
                "paul",
            )
            .unwrap();

        assert_eq!(affected, 0);
    }

    #[test]
    fn update_records_error_message() {
        let db = setup_db();
        let template_id = db.register_page("whatsfresh", "crudTmplt").unwrap();
        let target_id = db.register_page("whatsfresh", "ingrType").unwrap();
        let session_id = db.create_session(template_id, target_id, "paul").unwrap();

        db.update_session(
            &session_id,
            SessionUpdate {
                error_message: Some("components step failed".to_string()),
                ..Default::default()
            },
            "paul",
        )
        .unwrap();

        let status = db.get_session_status(&session_id).unwrap().unwrap();
        assert_eq!(
            status.error_message,
            Some("components step failed".to_string())
        );
    }
}

mod list_and_delete_tests {
    use super::*;

    #[test]
    fn list_sessions_returns_active_rows_up_to_limit() {
        let db = setup_db();
        let template_id = db.register_page("whatsfresh", "crudTmplt").unwrap();
        let a = db.register_page("whatsfresh", "ingrType").unwrap();
        let b = db.register_page("whatsfresh", "prodType").unwrap();
        let c = db.register_page("whatsfresh", "brndList").unwrap();

        db.create_session(template_id, a, "paul").unwrap();
        db.create_session(template_id, b, "paul").unwrap();
        db.create_session(template_id, c, "paul").unwrap();

        let all = db.list_sessions(10).unwrap();
        assert_eq!(all.len(), 3);

        let limited = db.list_sessions(2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn soft_delete_hides_session_from_load_and_list() {
        let db = setup_db();
        let template_id = db.register_page("whatsfresh", "crudTmplt").unwrap();
        let target_id = db.register_page("whatsfresh", "ingrType").unwrap();
        let session_id = db.create_session(template_id, target_id, "paul").unwrap();

        db.soft_delete_session(&session_id, "admin").unwrap();

        let err = db.load_session(&session_id).unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
        assert!(db.list_sessions(10).unwrap().is_empty());
        assert!(db.get_session_status(&session_id).unwrap().is_none());
    }
}

mod status_tests {
    use super::*;

    #[test]
    fn get_status_returns_step_and_status() {
        let db = setup_db();
        let template_id = db.register_page("whatsfresh", "crudTmplt").unwrap();
        let target_id = db.register_page("whatsfresh", "ingrType").unwrap();
        let session_id = db.create_session(template_id, target_id, "paul").unwrap();

        let status = db.get_session_status(&session_id).unwrap().unwrap();

        assert_eq!(status.session_id, session_id);
        assert_eq!(status.current_step, CloneStep::Init);
        assert_eq!(status.status, SessionStatus::InProgress);
        assert!(status.error_message.is_none());
    }

    #[test]
    fn get_status_returns_none_for_unknown_session() {
        let db = setup_db();

        assert!(db.get_session_status("unknown").unwrap().is_none());
    }
}
