use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use safetyboard_core::db::open_db_in_memory;
use safetyboard_core::engine::decision::DecisionStatus;
use safetyboard_core::engine::risk::RiskTier;
use safetyboard_core::engine::root_cause::RootCauseSelection;
use safetyboard_core::model::action_plan::ActionItemInput;
use safetyboard_core::model::cause::CauseCategory;
use safetyboard_core::model::failure_mode::{
    FailureModeDraft, ProbabilityCategory, SeverityCategory,
};
use safetyboard_core::model::pdca::{PdcaCycle, PdcaStage};
use safetyboard_core::repo::analysis_repo::AnalysisRepository;
use safetyboard_core::service::cause_service::CauseService;
use safetyboard_core::service::fmea_service::FmeaService;
use safetyboard_core::service::plan_service::PlanService;
use safetyboard_core::service::session_service::SessionService;
use safetyboard_core::{
    Actor, Card, CardRepository, CardType, SqliteAnalysisRepository, SqliteCardRepository,
    SqliteSessionRepository, ToolKind, ToolOwner, ToolServiceError, ValidationError,
};

fn actor() -> Actor {
    Actor::new(Some("analyst"), Utc.with_ymd_and_hms(2024, 5, 6, 14, 0, 0).unwrap())
}

fn card_owner(conn: &Connection, title: &str) -> ToolOwner {
    let repo = SqliteCardRepository::try_new(conn).unwrap();
    let id = repo
        .create_card(&Card::new(CardType::Event, title))
        .unwrap();
    ToolOwner::Card(id)
}

fn stored_card(conn: &Connection, owner: &ToolOwner) -> Card {
    SqliteCardRepository::try_new(conn)
        .unwrap()
        .get_card(owner.id())
        .unwrap()
        .unwrap()
}

#[test]
fn root_cause_follows_the_heaviest_category() {
    let conn = open_db_in_memory().unwrap();
    let owner = card_owner(&conn, "fall");
    let service = CauseService::new(SqliteAnalysisRepository::try_new(&conn).unwrap());

    let wet_floor = service
        .add_cause(&owner, Some(CauseCategory::Environment), "wet floor", 3, &actor())
        .unwrap();
    let fatigue = service
        .add_cause(&owner, Some(CauseCategory::Manpower), "fatigue", 2, &actor())
        .unwrap();
    service
        .add_cause(&owner, Some(CauseCategory::Manpower), "understaffing", 2, &actor())
        .unwrap();

    let diagram = service.diagram(&owner).unwrap();
    assert_eq!(diagram.bones.len(), 7);
    assert_eq!(
        diagram.root_cause,
        RootCauseSelection::Suggested {
            category: Some(CauseCategory::Manpower),
            cause_id: fatigue.id.clone(),
        }
    );
    let card = stored_card(&conn, &owner);
    assert_eq!(card.root_cause_id.as_deref(), Some(fatigue.id.as_str()));
    assert!(card.tools_used.ishikawa);

    let selection = service.set_impact(&owner, &wet_floor.id, 5).unwrap();
    assert_eq!(selection.cause_id(), Some(wet_floor.id.as_str()));
    assert_eq!(
        stored_card(&conn, &owner).root_cause_id.as_deref(),
        Some(wet_floor.id.as_str())
    );
}

#[test]
fn pinned_root_cause_survives_until_its_cause_is_deleted() {
    let conn = open_db_in_memory().unwrap();
    let owner = card_owner(&conn, "wrong dose");
    let service = CauseService::new(SqliteAnalysisRepository::try_new(&conn).unwrap());

    let heavy = service
        .add_cause(&owner, Some(CauseCategory::Method), "no double check", 5, &actor())
        .unwrap();
    let light = service
        .add_cause(&owner, Some(CauseCategory::Material), "similar labels", 1, &actor())
        .unwrap();

    service.pin_root_cause(&owner, &light.id).unwrap();
    let selection = service.refresh_root_cause(&owner).unwrap();
    assert!(selection.is_pinned());
    assert_eq!(selection.cause_id(), Some(light.id.as_str()));

    service
        .add_cause(&owner, Some(CauseCategory::Method), "rushed round", 4, &actor())
        .unwrap();
    assert_eq!(
        service.diagram(&owner).unwrap().root_cause.cause_id(),
        Some(light.id.as_str())
    );

    let after_delete = service.delete_cause(&owner, &light.id).unwrap();
    assert!(!after_delete.is_pinned());
    assert_eq!(after_delete.cause_id(), Some(heavy.id.as_str()));
    let card = stored_card(&conn, &owner);
    assert!(!card.root_cause_pinned);
    assert_eq!(card.root_cause_id.as_deref(), Some(heavy.id.as_str()));
}

#[test]
fn pinning_an_unknown_cause_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let owner = card_owner(&conn, "infection");
    let service = CauseService::new(SqliteAnalysisRepository::try_new(&conn).unwrap());

    let err = service.pin_root_cause(&owner, "ghost").unwrap_err();
    assert!(matches!(err, ToolServiceError::NotFound { entity: "cause", .. }));
}

#[test]
fn unsorted_causes_move_between_bones_and_unpin_resumes_suggestion() {
    let conn = open_db_in_memory().unwrap();
    let owner = card_owner(&conn, "delay");
    let service = CauseService::new(SqliteAnalysisRepository::try_new(&conn).unwrap());

    let pooled = service.add_cause(&owner, None, "unclear", 1, &actor()).unwrap();
    let other = service
        .add_cause(&owner, Some(CauseCategory::Machine), "pump alarm", 1, &actor())
        .unwrap();
    service.pin_root_cause(&owner, &other.id).unwrap();

    service
        .move_cause(&owner, &pooled.id, Some(CauseCategory::Measurement))
        .unwrap();
    service.set_impact(&owner, &pooled.id, 3).unwrap();
    let diagram = service.diagram(&owner).unwrap();
    assert_eq!(diagram.root_cause.cause_id(), Some(other.id.as_str()));

    let resumed = service.unpin_root_cause(&owner).unwrap();
    assert_eq!(resumed.cause_id(), Some(pooled.id.as_str()));
    assert!(!resumed.is_pinned());
}

#[test]
fn blank_cause_text_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let owner = card_owner(&conn, "fall");
    let service = CauseService::new(SqliteAnalysisRepository::try_new(&conn).unwrap());

    let err = service.add_cause(&owner, None, "  ", 1, &actor()).unwrap_err();
    assert!(matches!(
        err,
        ToolServiceError::Validation(ValidationError::EmptyCauseText)
    ));
}

#[test]
fn fmea_rows_persist_their_decision_and_sort_by_hazard() {
    let conn = open_db_in_memory().unwrap();
    let owner = card_owner(&conn, "sclerotherapy burn");
    let service = FmeaService::new(SqliteAnalysisRepository::try_new(&conn).unwrap());

    let low = FailureModeDraft {
        step: "Prescription".to_string(),
        failure_mode: "Illegible order".to_string(),
        severity_cat: SeverityCategory::Minor,
        prob_cat: ProbabilityCategory::Remote,
        ..FailureModeDraft::default()
    };
    let high = FailureModeDraft {
        step: "Administration".to_string(),
        failure_mode: "Wrong concentration".to_string(),
        severity_cat: SeverityCategory::Catastrophic,
        prob_cat: ProbabilityCategory::Occasional,
        single_point: true,
        ..FailureModeDraft::default()
    };
    service.add(&owner, &low, &actor()).unwrap();
    let stored_high = service.add(&owner, &high, &actor()).unwrap();
    assert_eq!(stored_high.hazard_score, 12);
    assert_eq!(stored_high.risk_level, RiskTier::High);
    assert_eq!(stored_high.decision, DecisionStatus::Action);

    let rows = service.list(&owner).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, stored_high.id);
    assert_eq!(rows[1].decision, DecisionStatus::Monitor);
    assert!(stored_card(&conn, &owner).tools_used.fmea);

    service.delete(&owner, &stored_high.id).unwrap();
    assert_eq!(service.list(&owner).unwrap().len(), 1);
}

#[test]
fn fmea_template_adds_starter_rows() {
    let conn = open_db_in_memory().unwrap();
    let owner = card_owner(&conn, "handover gap");
    let service = FmeaService::new(SqliteAnalysisRepository::try_new(&conn).unwrap());

    let rows = service.generate_template(&owner, &actor()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].hazard_score, 9);
    assert_eq!(rows[0].decision, DecisionStatus::Action);
    assert_eq!(rows[1].hazard_score, 6);
    assert_eq!(rows[1].decision, DecisionStatus::Monitor);
}

#[test]
fn fmea_requires_step_and_failure_mode() {
    let conn = open_db_in_memory().unwrap();
    let owner = card_owner(&conn, "fall");
    let service = FmeaService::new(SqliteAnalysisRepository::try_new(&conn).unwrap());

    let err = service
        .add(&owner, &FailureModeDraft::default(), &actor())
        .unwrap_err();
    assert!(matches!(
        err,
        ToolServiceError::Validation(ValidationError::EmptyStep)
    ));
    assert!(service.list(&owner).unwrap().is_empty());
}

#[test]
fn action_plan_pdca_and_notes_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let owner = card_owner(&conn, "medication error");
    let service = PlanService::new(SqliteAnalysisRepository::try_new(&conn).unwrap());

    let item = service
        .add_action(
            &owner,
            &ActionItemInput {
                what: "Introduce double check".to_string(),
                who: "Pharmacy".to_string(),
                when: Some("2024-06-01".to_string()),
                ..ActionItemInput::default()
            },
            &actor(),
        )
        .unwrap();
    service.set_action_status(&owner, &item.id, "done").unwrap();
    let actions = service.actions(&owner).unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].status, "done");

    assert_eq!(service.pdca(&owner).unwrap(), PdcaCycle::default());
    let saved = service
        .save_pdca(
            &owner,
            &PdcaCycle {
                stage: PdcaStage::Check,
                plan: "Define double check".to_string(),
                ..PdcaCycle::default()
            },
            &actor(),
        )
        .unwrap();
    assert_eq!(saved.updated_by.as_deref(), Some("analyst"));
    assert_eq!(service.pdca(&owner).unwrap(), saved);

    service.save_notes(&owner, "first", &actor()).unwrap();
    service.save_notes(&owner, "second", &actor()).unwrap();
    assert_eq!(service.notes(&owner).unwrap().text, "second");

    let card = stored_card(&conn, &owner);
    assert!(card.tools_used.w2h);
    assert!(card.tools_used.pdca);

    service.delete_action(&owner, &item.id).unwrap();
    assert!(service.actions(&owner).unwrap().is_empty());
}

#[test]
fn session_tools_are_isolated_and_cascade_on_delete() {
    let conn = open_db_in_memory().unwrap();
    let sessions = SessionService::new(SqliteSessionRepository::try_new(&conn).unwrap());
    let causes = CauseService::new(SqliteAnalysisRepository::try_new(&conn).unwrap());

    let session = sessions
        .create("Falls workshop", ToolKind::Ishikawa, &actor())
        .unwrap();
    let owner = ToolOwner::Session(session.id.clone());
    causes
        .add_cause(&owner, Some(CauseCategory::Environment), "poor lighting", 2, &actor())
        .unwrap();
    let card = card_owner(&conn, "unrelated");
    assert!(causes.causes(&card).unwrap().is_empty());
    assert_eq!(causes.causes(&owner).unwrap().len(), 1);

    assert_eq!(sessions.list().unwrap().len(), 1);
    sessions.delete(&session.id).unwrap();
    assert!(matches!(
        sessions.get(&session.id).unwrap_err(),
        ToolServiceError::NotFound { .. }
    ));
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM causes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn blank_session_title_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let sessions = SessionService::new(SqliteSessionRepository::try_new(&conn).unwrap());
    let err = sessions.create("  ", ToolKind::Pdca, &actor()).unwrap_err();
    assert!(matches!(
        err,
        ToolServiceError::Validation(ValidationError::EmptySessionTitle)
    ));
}

#[test]
fn tools_on_a_missing_owner_report_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnalysisRepository::try_new(&conn).unwrap();
    let owner = ToolOwner::Card("missing".to_string());
    let err = repo
        .save_notes(&owner, &Default::default())
        .unwrap_err();
    assert!(err.is_not_found());
}
