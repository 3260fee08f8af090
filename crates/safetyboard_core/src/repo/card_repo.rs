//! Card repository contract and SQLite implementation.
//!
//! # Invariants
//! - Writes call `Card::validate()` (or the equivalent title check) first.
//! - Updates are partial: each call touches only its own columns.
//! - Archival is terminal; re-archiving keeps the first archival stamp.

use super::{bool_to_int, ensure_schema, int_to_bool, RepoError, RepoResult, SchemaRequirement};
use crate::model::card::{
    Card, CardId, CardStatus, CardType, PctFields, Severity, ToolsUsed,
};
use crate::model::ValidationError;
use rusqlite::types::Value;
use rusqlite::{named_params, params, params_from_iter, Connection, OptionalExtension, Row};

const CARD_SELECT_SQL: &str = "SELECT
    id, type, title, description, unit, owner, severity, event_date, deadline, status,
    archived, archived_at, archived_by, created_by, created_at, quality_related,
    tool_ishikawa, tool_w2h, tool_pdca, tool_fmea,
    root_cause_id, root_cause_pinned, ishikawa_effect,
    event_code, patient_name, patient_dob, notification_date, notification_system,
    notification_text, chronology_text, outcome_text, interview_text,
    investigation_team, conclusion_text
FROM cards";

const REQUIRED_SCHEMA: &[SchemaRequirement] = &[(
    "cards",
    &[
        "id",
        "type",
        "title",
        "status",
        "archived",
        "severity",
        "event_date",
        "deadline",
        "root_cause_id",
        "conclusion_text",
    ],
)];

/// Which cards a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArchiveScope {
    /// Cards still on the board.
    #[default]
    Active,
    Archived,
    All,
}

#[derive(Debug, Clone, Default)]
pub struct CardListQuery {
    pub scope: ArchiveScope,
    pub kind: Option<CardType>,
}

/// Editable card attributes besides title, status and investigation fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pub desc: String,
    pub unit: String,
    pub owner: String,
    pub severity: Severity,
    pub date: Option<String>,
    pub deadline: Option<String>,
    pub quality_related: bool,
}

pub trait CardRepository {
    fn create_card(&self, card: &Card) -> RepoResult<CardId>;
    fn get_card(&self, id: &str) -> RepoResult<Option<Card>>;
    /// Snapshot read, oldest first.
    fn list_cards(&self, query: &CardListQuery) -> RepoResult<Vec<Card>>;
    fn update_status(&self, id: &str, status: CardStatus) -> RepoResult<()>;
    fn update_title(&self, id: &str, title: &str) -> RepoResult<()>;
    fn update_details(&self, id: &str, details: &CardDetails) -> RepoResult<()>;
    fn save_pct(&self, id: &str, pct: &PctFields) -> RepoResult<()>;
    /// Sets `archived`, `status=done` and the archival stamp.
    fn archive_card(
        &self,
        id: &str,
        archived_by: Option<&str>,
        archived_at: &str,
    ) -> RepoResult<()>;
}

pub struct SqliteCardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCardRepository<'conn> {
    /// Builds a repository over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }

    fn expect_changed(&self, changed: usize, id: &str) -> RepoResult<()> {
        if changed == 0 {
            return Err(RepoError::not_found("card", id));
        }
        Ok(())
    }
}

impl CardRepository for SqliteCardRepository<'_> {
    fn create_card(&self, card: &Card) -> RepoResult<CardId> {
        card.validate()?;
        let pct = &card.pct;

        self.conn.execute(
            "INSERT INTO cards (
                id, type, title, description, unit, owner, severity, event_date, deadline,
                status, archived, archived_at, archived_by, created_by, created_at,
                quality_related, tool_ishikawa, tool_w2h, tool_pdca, tool_fmea,
                root_cause_id, root_cause_pinned, ishikawa_effect,
                event_code, patient_name, patient_dob, notification_date, notification_system,
                notification_text, chronology_text, outcome_text, interview_text,
                investigation_team, conclusion_text
            ) VALUES (
                :id, :type, :title, :description, :unit, :owner, :severity, :event_date,
                :deadline, :status, :archived, :archived_at, :archived_by, :created_by,
                :created_at, :quality_related, :tool_ishikawa, :tool_w2h, :tool_pdca,
                :tool_fmea, :root_cause_id, :root_cause_pinned, :ishikawa_effect,
                :event_code, :patient_name, :patient_dob, :notification_date,
                :notification_system, :notification_text, :chronology_text, :outcome_text,
                :interview_text, :investigation_team, :conclusion_text
            );",
            named_params! {
                ":id": card.id,
                ":type": card.kind.as_str(),
                ":title": card.title.trim(),
                ":description": card.desc,
                ":unit": card.unit,
                ":owner": card.owner,
                ":severity": card.severity.as_str(),
                ":event_date": card.date,
                ":deadline": card.deadline,
                ":status": card.status.as_str(),
                ":archived": bool_to_int(card.archived),
                ":archived_at": card.archived_at,
                ":archived_by": card.archived_by,
                ":created_by": card.created_by,
                ":created_at": card.created_at,
                ":quality_related": bool_to_int(card.quality_related),
                ":tool_ishikawa": bool_to_int(card.tools_used.ishikawa),
                ":tool_w2h": bool_to_int(card.tools_used.w2h),
                ":tool_pdca": bool_to_int(card.tools_used.pdca),
                ":tool_fmea": bool_to_int(card.tools_used.fmea),
                ":root_cause_id": card.root_cause_id,
                ":root_cause_pinned": bool_to_int(card.root_cause_pinned),
                ":ishikawa_effect": card.ishikawa_effect,
                ":event_code": pct.event_code,
                ":patient_name": pct.patient_name,
                ":patient_dob": pct.patient_dob,
                ":notification_date": pct.notification_date,
                ":notification_system": pct.notification_system,
                ":notification_text": pct.notification_text,
                ":chronology_text": pct.chronology_text,
                ":outcome_text": pct.outcome_text,
                ":interview_text": pct.interview_text,
                ":investigation_team": pct.investigation_team,
                ":conclusion_text": pct.conclusion_text,
            },
        )?;

        Ok(card.id.clone())
    }

    fn get_card(&self, id: &str) -> RepoResult<Option<Card>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CARD_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_card_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_cards(&self, query: &CardListQuery) -> RepoResult<Vec<Card>> {
        let mut sql = format!("{CARD_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        match query.scope {
            ArchiveScope::Active => sql.push_str(" AND archived = 0"),
            ArchiveScope::Archived => sql.push_str(" AND archived = 1"),
            ArchiveScope::All => {}
        }
        if let Some(kind) = query.kind {
            sql.push_str(" AND type = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            cards.push(parse_card_row(row)?);
        }
        Ok(cards)
    }

    fn update_status(&self, id: &str, status: CardStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE cards SET status = ?1 WHERE id = ?2;",
            params![status.as_str(), id],
        )?;
        self.expect_changed(changed, id)
    }

    fn update_title(&self, id: &str, title: &str) -> RepoResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        let changed = self.conn.execute(
            "UPDATE cards SET title = ?1 WHERE id = ?2;",
            params![title, id],
        )?;
        self.expect_changed(changed, id)
    }

    fn update_details(&self, id: &str, details: &CardDetails) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE cards
             SET description = :description,
                 unit = :unit,
                 owner = :owner,
                 severity = :severity,
                 event_date = :event_date,
                 deadline = :deadline,
                 quality_related = :quality_related
             WHERE id = :id;",
            named_params! {
                ":description": details.desc,
                ":unit": details.unit,
                ":owner": details.owner,
                ":severity": details.severity.as_str(),
                ":event_date": details.date,
                ":deadline": details.deadline,
                ":quality_related": bool_to_int(details.quality_related),
                ":id": id,
            },
        )?;
        self.expect_changed(changed, id)
    }

    fn save_pct(&self, id: &str, pct: &PctFields) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE cards
             SET event_code = :event_code,
                 patient_name = :patient_name,
                 patient_dob = :patient_dob,
                 notification_date = :notification_date,
                 notification_system = :notification_system,
                 notification_text = :notification_text,
                 chronology_text = :chronology_text,
                 outcome_text = :outcome_text,
                 interview_text = :interview_text,
                 investigation_team = :investigation_team,
                 conclusion_text = :conclusion_text
             WHERE id = :id;",
            named_params! {
                ":event_code": pct.event_code,
                ":patient_name": pct.patient_name,
                ":patient_dob": pct.patient_dob,
                ":notification_date": pct.notification_date,
                ":notification_system": pct.notification_system,
                ":notification_text": pct.notification_text,
                ":chronology_text": pct.chronology_text,
                ":outcome_text": pct.outcome_text,
                ":interview_text": pct.interview_text,
                ":investigation_team": pct.investigation_team,
                ":conclusion_text": pct.conclusion_text,
                ":id": id,
            },
        )?;
        self.expect_changed(changed, id)
    }

    fn archive_card(
        &self,
        id: &str,
        archived_by: Option<&str>,
        archived_at: &str,
    ) -> RepoResult<()> {
        let archived: Option<i64> = self
            .conn
            .query_row("SELECT archived FROM cards WHERE id = ?1;", [id], |row| {
                row.get(0)
            })
            .optional()?;
        match archived {
            None => return Err(RepoError::not_found("card", id)),
            Some(1) => return Ok(()),
            Some(_) => {}
        }

        self.conn.execute(
            "UPDATE cards
             SET archived = 1, status = 'done', archived_at = ?1, archived_by = ?2
             WHERE id = ?3;",
            params![archived_at, archived_by, id],
        )?;
        Ok(())
    }
}

fn parse_card_row(row: &Row<'_>) -> RepoResult<Card> {
    let id: String = row.get("id")?;

    let type_text: String = row.get("type")?;
    let kind = CardType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid card type `{type_text}` in cards.type"))
    })?;

    let status_text: String = row.get("status")?;
    let status = CardStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in cards.status"))
    })?;

    let severity_text: String = row.get("severity")?;

    let card = Card {
        kind,
        title: row.get("title")?,
        desc: row.get("description")?,
        unit: row.get("unit")?,
        owner: row.get("owner")?,
        severity: Severity::parse(&severity_text),
        date: row.get("event_date")?,
        deadline: row.get("deadline")?,
        status,
        archived: int_to_bool(row.get("archived")?, "cards.archived")?,
        archived_at: row.get("archived_at")?,
        archived_by: row.get("archived_by")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        quality_related: int_to_bool(row.get("quality_related")?, "cards.quality_related")?,
        tools_used: ToolsUsed {
            ishikawa: int_to_bool(row.get("tool_ishikawa")?, "cards.tool_ishikawa")?,
            w2h: int_to_bool(row.get("tool_w2h")?, "cards.tool_w2h")?,
            pdca: int_to_bool(row.get("tool_pdca")?, "cards.tool_pdca")?,
            fmea: int_to_bool(row.get("tool_fmea")?, "cards.tool_fmea")?,
        },
        root_cause_id: row.get("root_cause_id")?,
        root_cause_pinned: int_to_bool(row.get("root_cause_pinned")?, "cards.root_cause_pinned")?,
        ishikawa_effect: row.get("ishikawa_effect")?,
        pct: PctFields {
            event_code: row.get("event_code")?,
            patient_name: row.get("patient_name")?,
            patient_dob: row.get("patient_dob")?,
            notification_date: row.get("notification_date")?,
            notification_system: row.get("notification_system")?,
            notification_text: row.get("notification_text")?,
            chronology_text: row.get("chronology_text")?,
            outcome_text: row.get("outcome_text")?,
            interview_text: row.get("interview_text")?,
            investigation_team: row.get("investigation_team")?,
            conclusion_text: row.get("conclusion_text")?,
        },
        id,
    };
    card.validate()?;
    Ok(card)
}
