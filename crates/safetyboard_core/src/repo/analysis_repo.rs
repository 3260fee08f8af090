//! Analysis tool records: causes, failure modes, action items, PDCA, notes.
//!
//! # Responsibility
//! - Persist tool records for either owner kind (card or canvas session).
//! - Keep root-cause pointer and effect label on the owner row.
//!
//! # Invariants
//! - Every write checks the owner exists and returns `NotFound` otherwise.
//! - Child keys are generated by the model layer and never reused.
//! - List order is insertion order, except failure modes (hazard score
//!   descending, then insertion order).

use super::{
    bool_to_int, ensure_schema, int_to_bool, owner_column, owner_entity, owner_table, RepoError,
    RepoResult, SchemaRequirement,
};
use crate::engine::decision::DecisionStatus;
use crate::engine::risk::RiskTier;
use crate::model::action_plan::ActionItem;
use crate::model::cause::{CauseCategory, CauseNode};
use crate::model::failure_mode::{FailureModeRecord, ProbabilityCategory, SeverityCategory};
use crate::model::pdca::{PdcaCycle, PdcaStage};
use crate::model::session::{NotesDoc, ToolKind, ToolOwner};
use crate::model::ValidationError;
use rusqlite::{named_params, params, Connection, OptionalExtension, Row};

const REQUIRED_SCHEMA: &[SchemaRequirement] = &[
    ("causes", &["id", "card_id", "session_id", "seq", "category", "impact"]),
    (
        "failure_modes",
        &["id", "card_id", "session_id", "hazard_score", "decision_text"],
    ),
    ("action_items", &["id", "card_id", "session_id", "what", "status"]),
    ("pdca_cycles", &["card_id", "session_id", "stage"]),
    ("notes", &["card_id", "session_id", "body"]),
    ("tool_sessions", &["id", "root_cause_id", "ishikawa_effect"]),
];

/// Stored root-cause pointer of one owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootCauseState {
    pub root_cause_id: Option<String>,
    pub pinned: bool,
}

pub trait AnalysisRepository {
    fn add_cause(&self, owner: &ToolOwner, cause: &CauseNode) -> RepoResult<String>;
    fn list_causes(&self, owner: &ToolOwner) -> RepoResult<Vec<CauseNode>>;
    fn update_cause_category(
        &self,
        owner: &ToolOwner,
        cause_id: &str,
        category: Option<CauseCategory>,
    ) -> RepoResult<()>;
    fn update_cause_impact(
        &self,
        owner: &ToolOwner,
        cause_id: &str,
        impact: u32,
    ) -> RepoResult<()>;
    fn delete_cause(&self, owner: &ToolOwner, cause_id: &str) -> RepoResult<()>;

    fn root_cause_state(&self, owner: &ToolOwner) -> RepoResult<RootCauseState>;
    fn set_root_cause(
        &self,
        owner: &ToolOwner,
        cause_id: Option<&str>,
        pinned: bool,
    ) -> RepoResult<()>;
    fn set_effect_label(&self, owner: &ToolOwner, label: Option<&str>) -> RepoResult<()>;

    fn add_failure_mode(
        &self,
        owner: &ToolOwner,
        record: &FailureModeRecord,
    ) -> RepoResult<String>;
    fn list_failure_modes(&self, owner: &ToolOwner) -> RepoResult<Vec<FailureModeRecord>>;
    fn delete_failure_mode(&self, owner: &ToolOwner, id: &str) -> RepoResult<()>;

    fn add_action_item(&self, owner: &ToolOwner, item: &ActionItem) -> RepoResult<String>;
    fn list_action_items(&self, owner: &ToolOwner) -> RepoResult<Vec<ActionItem>>;
    fn update_action_status(&self, owner: &ToolOwner, id: &str, status: &str) -> RepoResult<()>;
    fn delete_action_item(&self, owner: &ToolOwner, id: &str) -> RepoResult<()>;

    fn get_pdca(&self, owner: &ToolOwner) -> RepoResult<Option<PdcaCycle>>;
    fn save_pdca(&self, owner: &ToolOwner, cycle: &PdcaCycle) -> RepoResult<()>;

    fn get_notes(&self, owner: &ToolOwner) -> RepoResult<Option<NotesDoc>>;
    fn save_notes(&self, owner: &ToolOwner, notes: &NotesDoc) -> RepoResult<()>;

    /// Sets the card's usage flag for `tool`. Sessions carry no flags.
    fn mark_tool_used(&self, owner: &ToolOwner, tool: ToolKind) -> RepoResult<()>;
}

pub struct SqliteAnalysisRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnalysisRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }

    fn ensure_owner(&self, owner: &ToolOwner) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
                owner_table(owner)
            ),
            [owner.id()],
            |row| row.get(0),
        )?;
        if exists == 1 {
            Ok(())
        } else {
            Err(RepoError::not_found(owner_entity(owner), owner.id()))
        }
    }

    fn next_seq(&self, table: &str, owner: &ToolOwner) -> RepoResult<i64> {
        Ok(self.conn.query_row(
            &format!(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM {table} WHERE {} = ?1;",
                owner_column(owner)
            ),
            [owner.id()],
            |row| row.get(0),
        )?)
    }

    fn delete_child(
        &self,
        table: &str,
        entity: &'static str,
        owner: &ToolOwner,
        id: &str,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {table} WHERE id = ?1 AND {} = ?2;",
                owner_column(owner)
            ),
            params![id, owner.id()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(entity, id));
        }
        Ok(())
    }

    fn update_child(
        &self,
        sql_set: &str,
        table: &str,
        entity: &'static str,
        owner: &ToolOwner,
        id: &str,
        value: &dyn rusqlite::ToSql,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE {table} SET {sql_set} = ?1 WHERE id = ?2 AND {} = ?3;",
                owner_column(owner)
            ),
            params![value, id, owner.id()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(entity, id));
        }
        Ok(())
    }

    fn update_owner_row(
        &self,
        owner: &ToolOwner,
        sql_set: &str,
        values: &[&dyn rusqlite::ToSql],
    ) -> RepoResult<()> {
        let mut bound: Vec<&dyn rusqlite::ToSql> = values.to_vec();
        let owner_id = owner.id();
        bound.push(&owner_id);
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {sql_set} WHERE id = ?{};",
                owner_table(owner),
                bound.len()
            ),
            bound.as_slice(),
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(owner_entity(owner), owner_id));
        }
        Ok(())
    }

    fn select_owned<T>(
        &self,
        sql: &str,
        owner: &ToolOwner,
        parse: impl Fn(&Row<'_>) -> RepoResult<T>,
    ) -> RepoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([owner.id()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(parse(row)?);
        }
        Ok(out)
    }
}

fn owner_ids(owner: &ToolOwner) -> (Option<&str>, Option<&str>) {
    match owner {
        ToolOwner::Card(id) => (Some(id.as_str()), None),
        ToolOwner::Session(id) => (None, Some(id.as_str())),
    }
}

impl AnalysisRepository for SqliteAnalysisRepository<'_> {
    fn add_cause(&self, owner: &ToolOwner, cause: &CauseNode) -> RepoResult<String> {
        if cause.text.trim().is_empty() {
            return Err(ValidationError::EmptyCauseText.into());
        }
        self.ensure_owner(owner)?;
        let (card_id, session_id) = owner_ids(owner);
        let seq = self.next_seq("causes", owner)?;

        self.conn.execute(
            "INSERT INTO causes (id, card_id, session_id, seq, category, text, impact, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                cause.id,
                card_id,
                session_id,
                seq,
                cause.cat.map(CauseCategory::as_str),
                cause.text.trim(),
                cause.impact.max(1),
                cause.created_by,
                cause.created_at,
            ],
        )?;
        Ok(cause.id.clone())
    }

    fn list_causes(&self, owner: &ToolOwner) -> RepoResult<Vec<CauseNode>> {
        self.select_owned(
            &format!(
                "SELECT id, category, text, impact, created_by, created_at
                 FROM causes WHERE {} = ?1 ORDER BY seq ASC;",
                owner_column(owner)
            ),
            owner,
            parse_cause_row,
        )
    }

    fn update_cause_category(
        &self,
        owner: &ToolOwner,
        cause_id: &str,
        category: Option<CauseCategory>,
    ) -> RepoResult<()> {
        self.update_child(
            "category",
            "causes",
            "cause",
            owner,
            cause_id,
            &category.map(CauseCategory::as_str),
        )
    }

    fn update_cause_impact(
        &self,
        owner: &ToolOwner,
        cause_id: &str,
        impact: u32,
    ) -> RepoResult<()> {
        self.update_child(
            "impact",
            "causes",
            "cause",
            owner,
            cause_id,
            &impact.max(1),
        )
    }

    fn delete_cause(&self, owner: &ToolOwner, cause_id: &str) -> RepoResult<()> {
        self.delete_child("causes", "cause", owner, cause_id)
    }

    fn root_cause_state(&self, owner: &ToolOwner) -> RepoResult<RootCauseState> {
        let state = self
            .conn
            .query_row(
                &format!(
                    "SELECT root_cause_id, root_cause_pinned FROM {} WHERE id = ?1;",
                    owner_table(owner)
                ),
                [owner.id()],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, i64>(1)?,
                    ))
                },
            )
            .optional()?;
        let (root_cause_id, pinned) =
            state.ok_or_else(|| RepoError::not_found(owner_entity(owner), owner.id()))?;
        Ok(RootCauseState {
            root_cause_id,
            pinned: int_to_bool(pinned, "root_cause_pinned")?,
        })
    }

    fn set_root_cause(
        &self,
        owner: &ToolOwner,
        cause_id: Option<&str>,
        pinned: bool,
    ) -> RepoResult<()> {
        self.update_owner_row(
            owner,
            "root_cause_id = ?1, root_cause_pinned = ?2",
            &[&cause_id, &bool_to_int(pinned)],
        )
    }

    fn set_effect_label(&self, owner: &ToolOwner, label: Option<&str>) -> RepoResult<()> {
        let label = label.map(str::trim).filter(|value| !value.is_empty());
        self.update_owner_row(owner, "ishikawa_effect = ?1", &[&label])
    }

    fn add_failure_mode(
        &self,
        owner: &ToolOwner,
        record: &FailureModeRecord,
    ) -> RepoResult<String> {
        if record.step.trim().is_empty() {
            return Err(ValidationError::EmptyStep.into());
        }
        if record.failure_mode.trim().is_empty() {
            return Err(ValidationError::EmptyFailureMode.into());
        }
        self.ensure_owner(owner)?;
        let (card_id, session_id) = owner_ids(owner);
        let seq = self.next_seq("failure_modes", owner)?;

        self.conn.execute(
            "INSERT INTO failure_modes (
                id, card_id, session_id, seq, step, failure_mode, cause, effect, controls,
                severity_cat, prob_cat, hazard_score, risk_level, decision, decision_text,
                single_point, control_effective, detectable, action, owner, due,
                created_by, created_at
            ) VALUES (
                :id, :card_id, :session_id, :seq, :step, :failure_mode, :cause, :effect,
                :controls, :severity_cat, :prob_cat, :hazard_score, :risk_level, :decision,
                :decision_text, :single_point, :control_effective, :detectable, :action,
                :owner, :due, :created_by, :created_at
            );",
            named_params! {
                ":id": record.id,
                ":card_id": card_id,
                ":session_id": session_id,
                ":seq": seq,
                ":step": record.step,
                ":failure_mode": record.failure_mode,
                ":cause": record.cause,
                ":effect": record.effect,
                ":controls": record.controls,
                ":severity_cat": record.severity_cat.level(),
                ":prob_cat": record.prob_cat.level(),
                ":hazard_score": record.hazard_score,
                ":risk_level": record.risk_level.label(),
                ":decision": record.decision.as_str(),
                ":decision_text": record.decision_text,
                ":single_point": bool_to_int(record.single_point),
                ":control_effective": bool_to_int(record.control_effective),
                ":detectable": bool_to_int(record.detectable),
                ":action": record.action,
                ":owner": record.owner,
                ":due": record.due,
                ":created_by": record.created_by,
                ":created_at": record.created_at,
            },
        )?;
        Ok(record.id.clone())
    }

    fn list_failure_modes(&self, owner: &ToolOwner) -> RepoResult<Vec<FailureModeRecord>> {
        self.select_owned(
            &format!(
                "SELECT id, step, failure_mode, cause, effect, controls, severity_cat, prob_cat,
                        hazard_score, risk_level, decision, decision_text, single_point,
                        control_effective, detectable, action, owner, due, created_by, created_at
                 FROM failure_modes WHERE {} = ?1
                 ORDER BY hazard_score DESC, seq ASC;",
                owner_column(owner)
            ),
            owner,
            parse_failure_mode_row,
        )
    }

    fn delete_failure_mode(&self, owner: &ToolOwner, id: &str) -> RepoResult<()> {
        self.delete_child("failure_modes", "failure mode", owner, id)
    }

    fn add_action_item(&self, owner: &ToolOwner, item: &ActionItem) -> RepoResult<String> {
        if item.what.trim().is_empty() {
            return Err(ValidationError::EmptyActionWhat.into());
        }
        self.ensure_owner(owner)?;
        let (card_id, session_id) = owner_ids(owner);
        let seq = self.next_seq("action_items", owner)?;

        self.conn.execute(
            "INSERT INTO action_items (
                id, card_id, session_id, seq, what, who, why, where_text, when_date, how,
                how_much, status, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                item.id,
                card_id,
                session_id,
                seq,
                item.what,
                item.who,
                item.why,
                item.where_,
                item.when,
                item.how,
                item.how_much,
                item.status,
                item.created_by,
                item.created_at,
            ],
        )?;
        Ok(item.id.clone())
    }

    fn list_action_items(&self, owner: &ToolOwner) -> RepoResult<Vec<ActionItem>> {
        self.select_owned(
            &format!(
                "SELECT id, what, who, why, where_text, when_date, how, how_much, status,
                        created_by, created_at
                 FROM action_items WHERE {} = ?1 ORDER BY seq ASC;",
                owner_column(owner)
            ),
            owner,
            |row| {
                Ok(ActionItem {
                    id: row.get("id")?,
                    what: row.get("what")?,
                    who: row.get("who")?,
                    why: row.get("why")?,
                    where_: row.get("where_text")?,
                    when: row.get("when_date")?,
                    how: row.get("how")?,
                    how_much: row.get("how_much")?,
                    status: row.get("status")?,
                    created_by: row.get("created_by")?,
                    created_at: row.get("created_at")?,
                })
            },
        )
    }

    fn update_action_status(&self, owner: &ToolOwner, id: &str, status: &str) -> RepoResult<()> {
        self.update_child("status", "action_items", "action item", owner, id, &status.trim())
    }

    fn delete_action_item(&self, owner: &ToolOwner, id: &str) -> RepoResult<()> {
        self.delete_child("action_items", "action item", owner, id)
    }

    fn get_pdca(&self, owner: &ToolOwner) -> RepoResult<Option<PdcaCycle>> {
        let mut cycles = self.select_owned(
            &format!(
                "SELECT stage, plan_text, do_text, check_text, act_text, updated_by, updated_at
                 FROM pdca_cycles WHERE {} = ?1;",
                owner_column(owner)
            ),
            owner,
            |row| {
                let stage_text: String = row.get("stage")?;
                let stage = PdcaStage::parse(&stage_text).ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "invalid stage `{stage_text}` in pdca_cycles.stage"
                    ))
                })?;
                Ok(PdcaCycle {
                    stage,
                    plan: row.get("plan_text")?,
                    do_: row.get("do_text")?,
                    check: row.get("check_text")?,
                    act: row.get("act_text")?,
                    updated_by: row.get("updated_by")?,
                    updated_at: row.get("updated_at")?,
                })
            },
        )?;
        Ok(cycles.pop())
    }

    fn save_pdca(&self, owner: &ToolOwner, cycle: &PdcaCycle) -> RepoResult<()> {
        self.ensure_owner(owner)?;
        let (card_id, session_id) = owner_ids(owner);
        self.conn.execute(
            &format!(
                "INSERT INTO pdca_cycles (
                    card_id, session_id, stage, plan_text, do_text, check_text, act_text,
                    updated_by, updated_at
                 ) VALUES (:card_id, :session_id, :stage, :plan, :do, :check, :act,
                           :updated_by, :updated_at)
                 ON CONFLICT({}) DO UPDATE SET
                    stage = excluded.stage,
                    plan_text = excluded.plan_text,
                    do_text = excluded.do_text,
                    check_text = excluded.check_text,
                    act_text = excluded.act_text,
                    updated_by = excluded.updated_by,
                    updated_at = excluded.updated_at;",
                owner_column(owner)
            ),
            named_params! {
                ":card_id": card_id,
                ":session_id": session_id,
                ":stage": cycle.stage.as_str(),
                ":plan": cycle.plan,
                ":do": cycle.do_,
                ":check": cycle.check,
                ":act": cycle.act,
                ":updated_by": cycle.updated_by,
                ":updated_at": cycle.updated_at,
            },
        )?;
        Ok(())
    }

    fn get_notes(&self, owner: &ToolOwner) -> RepoResult<Option<NotesDoc>> {
        let mut notes = self.select_owned(
            &format!(
                "SELECT body, updated_by, updated_at FROM notes WHERE {} = ?1;",
                owner_column(owner)
            ),
            owner,
            |row| {
                Ok(NotesDoc {
                    text: row.get("body")?,
                    updated_by: row.get("updated_by")?,
                    updated_at: row.get("updated_at")?,
                })
            },
        )?;
        Ok(notes.pop())
    }

    fn save_notes(&self, owner: &ToolOwner, notes: &NotesDoc) -> RepoResult<()> {
        self.ensure_owner(owner)?;
        let (card_id, session_id) = owner_ids(owner);
        self.conn.execute(
            &format!(
                "INSERT INTO notes (card_id, session_id, body, updated_by, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT({}) DO UPDATE SET
                    body = excluded.body,
                    updated_by = excluded.updated_by,
                    updated_at = excluded.updated_at;",
                owner_column(owner)
            ),
            params![card_id, session_id, notes.text, notes.updated_by, notes.updated_at],
        )?;
        Ok(())
    }

    fn mark_tool_used(&self, owner: &ToolOwner, tool: ToolKind) -> RepoResult<()> {
        let ToolOwner::Card(card_id) = owner else {
            return Ok(());
        };
        let column = match tool {
            ToolKind::Ishikawa => "tool_ishikawa",
            ToolKind::ActionPlan => "tool_w2h",
            ToolKind::Pdca => "tool_pdca",
            ToolKind::Fmea => "tool_fmea",
            ToolKind::Notes => return Ok(()),
        };
        let changed = self.conn.execute(
            &format!("UPDATE cards SET {column} = 1 WHERE id = ?1;"),
            [card_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("card", card_id.as_str()));
        }
        Ok(())
    }
}

fn parse_cause_row(row: &Row<'_>) -> RepoResult<CauseNode> {
    let cat = match row.get::<_, Option<String>>("category")? {
        Some(value) => Some(CauseCategory::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid category `{value}` in causes.category"))
        })?),
        None => None,
    };
    let impact: i64 = row.get("impact")?;
    Ok(CauseNode {
        id: row.get("id")?,
        cat,
        text: row.get("text")?,
        impact: u32::try_from(impact)
            .ok()
            .filter(|impact| *impact >= 1)
            .ok_or_else(|| {
                RepoError::InvalidData(format!("invalid impact `{impact}` in causes.impact"))
            })?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_failure_mode_row(row: &Row<'_>) -> RepoResult<FailureModeRecord> {
    let severity_level: u8 = row.get("severity_cat")?;
    let severity_cat = SeverityCategory::from_level(severity_level).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid severity category `{severity_level}` in failure_modes.severity_cat"
        ))
    })?;
    let prob_level: u8 = row.get("prob_cat")?;
    let prob_cat = ProbabilityCategory::from_level(prob_level).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid probability category `{prob_level}` in failure_modes.prob_cat"
        ))
    })?;
    let risk_text: String = row.get("risk_level")?;
    let risk_level = RiskTier::parse(&risk_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid risk level `{risk_text}` in failure_modes.risk_level"
        ))
    })?;
    let decision_text_raw: String = row.get("decision")?;
    let decision = DecisionStatus::parse(&decision_text_raw).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid decision `{decision_text_raw}` in failure_modes.decision"
        ))
    })?;

    Ok(FailureModeRecord {
        id: row.get("id")?,
        step: row.get("step")?,
        failure_mode: row.get("failure_mode")?,
        cause: row.get("cause")?,
        effect: row.get("effect")?,
        controls: row.get("controls")?,
        severity_cat,
        prob_cat,
        hazard_score: row.get("hazard_score")?,
        risk_level,
        decision,
        decision_text: row.get("decision_text")?,
        single_point: int_to_bool(row.get("single_point")?, "failure_modes.single_point")?,
        control_effective: int_to_bool(
            row.get("control_effective")?,
            "failure_modes.control_effective",
        )?,
        detectable: int_to_bool(row.get("detectable")?, "failure_modes.detectable")?,
        action: row.get("action")?,
        owner: row.get("owner")?,
        due: row.get("due")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
    })
}
