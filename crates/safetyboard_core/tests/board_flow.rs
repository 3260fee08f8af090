use chrono::{NaiveDate, TimeZone, Utc};
use safetyboard_core::db::open_db_in_memory;
use safetyboard_core::engine::board::MoveRejection;
use safetyboard_core::engine::overdue::OverdueRule;
use safetyboard_core::model::card::PctFields;
use safetyboard_core::repo::card_repo::CardDetails;
use safetyboard_core::{
    Actor, BoardFilter, BoardService, BoardServiceError, CardRepository, CardStatus, CardType,
    MoveOutcome, NewCard, NotificationPolicy, Severity, SeverityFilter, SqliteCardRepository,
    UiState,
};

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn actor() -> Actor {
    Actor::new(Some("quality.nurse"), Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap())
}

fn event(title: &str, severity: Severity, event_date: &str) -> NewCard {
    NewCard {
        kind: CardType::Event,
        title: title.to_string(),
        details: CardDetails {
            unit: "ICU".to_string(),
            severity,
            date: Some(event_date.to_string()),
            ..CardDetails::default()
        },
    }
}

fn task(title: &str, deadline: Option<&str>) -> NewCard {
    NewCard {
        kind: CardType::Task,
        title: title.to_string(),
        details: CardDetails {
            severity: Severity::Severe,
            deadline: deadline.map(str::to_string),
            ..CardDetails::default()
        },
    }
}

#[test]
fn create_card_stamps_event_notification_defaults() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );

    let card = service
        .create_card(&event("  patient fall  ", Severity::Mild, "2024-01-01"), &actor())
        .unwrap();
    assert_eq!(card.title, "patient fall");
    assert_eq!(card.status, CardStatus::Backlog);
    assert_eq!(card.created_by.as_deref(), Some("quality.nurse"));
    assert_eq!(card.created_at.as_deref(), Some("2024-01-02T09:00:00.000Z"));
    assert_eq!(card.pct.notification_date.as_deref(), Some("2024-01-02"));
    assert_eq!(
        card.pct.notification_system.as_deref(),
        Some(PctFields::DEFAULT_NOTIFICATION_SYSTEM)
    );
}

#[test]
fn non_event_cards_are_stored_unclassified() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );

    let card = service.create_card(&task("renew protocol", None), &actor()).unwrap();
    assert_eq!(card.severity, Severity::Unclassified);
    assert!(card.pct.notification_system.is_none());
}

#[test]
fn create_card_rejects_blank_title() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );

    let err = service.create_card(&task("   ", None), &actor()).unwrap_err();
    assert!(matches!(err, BoardServiceError::Validation(_)));
    assert!(service.snapshot().unwrap().is_empty());
}

#[test]
fn severe_event_goes_late_after_five_days_and_is_reconciled_once() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );
    let card = service
        .create_card(&event("wrong-site surgery", Severity::Severe, "2024-01-01"), &actor())
        .unwrap();

    let on_time = service.board(&UiState::default(), date("2024-01-06")).unwrap();
    assert_eq!(on_time.column_of(&card.id), Some(CardStatus::Backlog));
    assert!(on_time.corrections.is_empty());

    let today = date("2024-01-07");
    let view = service.board(&UiState::default(), today).unwrap();
    assert_eq!(view.column_of(&card.id), Some(CardStatus::Late));
    let placed = &view.column(CardStatus::Late)[0];
    assert_eq!(placed.overdue.rule, OverdueRule::Regulatory);
    assert_eq!(placed.overdue.days_left, Some(-1));

    let first = service.reconcile(today).unwrap();
    assert_eq!(first.applied, vec![card.id.clone()]);
    assert_eq!(service.card(&card.id).unwrap().status, CardStatus::Late);

    let second = service.reconcile(today).unwrap();
    assert!(second.applied.is_empty());
}

#[test]
fn manual_deadline_drives_non_event_cards() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );
    let card = service
        .create_card(&task("audit hand hygiene", Some("2024-03-01")), &actor())
        .unwrap();

    let due_day = service.board(&UiState::default(), date("2024-03-01")).unwrap();
    assert_eq!(due_day.column_of(&card.id), Some(CardStatus::Backlog));

    let after = service.board(&UiState::default(), date("2024-03-02")).unwrap();
    assert_eq!(after.column_of(&card.id), Some(CardStatus::Late));
    assert_eq!(after.column(CardStatus::Late)[0].overdue.rule, OverdueRule::Manual);
}

#[test]
fn overdue_card_only_accepts_done() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    let service = BoardService::new(repo, NotificationPolicy::default());
    let card = service
        .create_card(&task("update checklist", Some("2024-01-05")), &actor())
        .unwrap();
    let today = date("2024-01-10");

    let outcome = service.move_card(&card.id, CardStatus::Doing, today).unwrap();
    assert_eq!(outcome, MoveOutcome::Rejected(MoveRejection::Overdue));
    assert_eq!(service.card(&card.id).unwrap().status, CardStatus::Late);

    let done = service.mark_done(&card.id, today).unwrap();
    assert_eq!(done, MoveOutcome::Moved(CardStatus::Done));
    let view = service.board(&UiState::default(), today).unwrap();
    assert_eq!(view.column_of(&card.id), Some(CardStatus::Done));
    assert!(view.corrections.is_empty());
}

#[test]
fn late_column_rejects_cards_that_are_not_overdue() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );
    let card = service.create_card(&task("draft policy", None), &actor()).unwrap();

    let outcome = service
        .move_card(&card.id, CardStatus::Late, date("2024-01-10"))
        .unwrap();
    assert_eq!(outcome, MoveOutcome::Rejected(MoveRejection::LateNotOverdue));
    assert_eq!(service.card(&card.id).unwrap().status, CardStatus::Backlog);

    let started = service.start_card(&card.id, date("2024-01-10")).unwrap();
    assert_eq!(started, MoveOutcome::Moved(CardStatus::Doing));
}

#[test]
fn editing_dates_releases_a_late_card() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );
    let card = service
        .create_card(&event("medication error", Severity::Moderate, "2024-01-01"), &actor())
        .unwrap();
    let today = date("2024-01-20");
    service.reconcile(today).unwrap();
    assert_eq!(service.card(&card.id).unwrap().status, CardStatus::Late);

    service
        .update_details(
            &card.id,
            &CardDetails {
                severity: Severity::Moderate,
                date: Some("2024-01-18".to_string()),
                ..CardDetails::default()
            },
        )
        .unwrap();
    let outcome = service.move_card(&card.id, CardStatus::Doing, today).unwrap();
    assert_eq!(outcome, MoveOutcome::Moved(CardStatus::Doing));
}

#[test]
fn released_late_card_dropped_on_late_stays_put() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );
    let card = service
        .create_card(&event("patient fall", Severity::Severe, "2024-01-01"), &actor())
        .unwrap();
    let today = date("2024-01-10");
    service.reconcile(today).unwrap();
    service
        .update_details(
            &card.id,
            &CardDetails {
                severity: Severity::Severe,
                date: Some("2024-01-09".to_string()),
                ..CardDetails::default()
            },
        )
        .unwrap();

    let outcome = service.move_card(&card.id, CardStatus::Late, today).unwrap();
    assert_eq!(outcome, MoveOutcome::Moved(CardStatus::Late));
    assert_eq!(service.card(&card.id).unwrap().status, CardStatus::Late);
}

#[test]
fn filter_hides_cards_without_changing_corrections() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );
    let overdue_task = service
        .create_card(&task("renew contract", Some("2024-01-01")), &actor())
        .unwrap();
    let severe = service
        .create_card(&event("pressure injury", Severity::Severe, "2024-01-09"), &actor())
        .unwrap();
    let today = date("2024-01-10");

    let ui = UiState {
        filter: BoardFilter::new("PRESSURE", SeverityFilter::Severe),
        open_card_id: None,
    };
    let view = service.board(&ui, today).unwrap();
    assert_eq!(view.column_of(&severe.id), Some(CardStatus::Backlog));
    assert_eq!(view.column_of(&overdue_task.id), None);
    assert_eq!(view.corrections.len(), 1);
    assert_eq!(view.corrections[0].card_id, overdue_task.id);
}

#[test]
fn archive_is_terminal_and_keeps_first_stamp() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    let service = BoardService::new(repo, NotificationPolicy::default());
    let card = service
        .create_card(&event("fall from bed", Severity::Mild, "2024-01-01"), &actor())
        .unwrap();

    let archived = service.archive(&card.id, &actor()).unwrap();
    assert!(archived.archived);
    assert_eq!(archived.status, CardStatus::Done);
    assert_eq!(archived.archived_by.as_deref(), Some("quality.nurse"));

    let later = Actor::new(Some("auditor"), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    let again = service.archive(&card.id, &later).unwrap();
    assert_eq!(again.archived_at, archived.archived_at);
    assert_eq!(again.archived_by.as_deref(), Some("quality.nurse"));

    let err = service
        .move_card(&card.id, CardStatus::Doing, date("2024-01-02"))
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::CardArchived(_)));
    let view = service.board(&UiState::default(), date("2024-01-02")).unwrap();
    assert_eq!(view.column_of(&card.id), None);
}

#[test]
fn save_pct_is_limited_to_events_and_clears_blanks() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );
    let event_card = service
        .create_card(&event("delayed diagnosis", Severity::Moderate, "2024-01-01"), &actor())
        .unwrap();
    let task_card = service.create_card(&task("training", None), &actor()).unwrap();

    let saved = service
        .save_pct(
            &event_card.id,
            &PctFields {
                event_code: Some(" EV-42 ".to_string()),
                patient_name: Some("   ".to_string()),
                ..PctFields::default()
            },
        )
        .unwrap();
    assert_eq!(saved.pct.event_code.as_deref(), Some("EV-42"));
    assert_eq!(saved.pct.patient_name, None);

    let err = service
        .save_pct(&task_card.id, &PctFields::default())
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::NotAnEvent(_)));
}

#[test]
fn unknown_card_is_reported_as_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    assert!(repo.update_status("missing", CardStatus::Done).unwrap_err().is_not_found());

    let service = BoardService::new(repo, NotificationPolicy::default());
    let err = service.rename("missing", "title").unwrap_err();
    assert!(matches!(err, BoardServiceError::CardNotFound(id) if id == "missing"));
}

#[test]
fn indicators_count_open_and_regulatory_windows() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(
        SqliteCardRepository::try_new(&conn).unwrap(),
        NotificationPolicy::default(),
    );
    service
        .create_card(&event("late severe", Severity::Severe, "2024-01-01"), &actor())
        .unwrap();
    service
        .create_card(&event("fresh mild", Severity::Mild, "2024-01-10"), &actor())
        .unwrap();
    let done = service.create_card(&task("closed task", None), &actor()).unwrap();
    service.mark_done(&done.id, date("2024-01-10")).unwrap();

    let indicators = service.indicators(date("2024-01-10")).unwrap();
    assert_eq!(indicators.open, 2);
    assert_eq!(indicators.today, 1);
    assert_eq!(indicators.regulatory_on_time, 1);
    assert_eq!(indicators.regulatory_late, 1);
    assert_eq!(indicators.complete, 0);
}
