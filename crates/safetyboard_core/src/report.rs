//! Case report document for archived cards.
//!
//! # Responsibility
//! - Assemble a format-neutral document (title, headed sections of lines
//!   and paragraphs) from a card and its analysis records.
//! - Render it through a [`ReportExporter`]; the built-in exporter writes
//!   plain text, richer formats plug in behind the same trait.
//!
//! # Invariants
//! - Absent values render as `-`.
//! - Failure modes appear by hazard score, highest first, capped at
//!   [`MAX_REPORTED_FAILURE_MODES`].

use crate::engine::decision::DecisionStatus;
use crate::engine::root_cause::group_causes;
use crate::model::action_plan::ActionItem;
use crate::model::card::{Card, PctFields};
use crate::model::cause::CauseNode;
use crate::model::failure_mode::FailureModeRecord;
use crate::model::pdca::{PdcaCycle, PdcaStage};
use std::fmt::{self, Write};

pub const MAX_REPORTED_FAILURE_MODES: usize = 12;
const MAX_FILE_STEM_CHARS: usize = 40;
const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportBlock {
    /// `label: value` line.
    Field { label: String, value: String },
    /// Wrapped free text.
    Paragraph(String),
    /// Bullet line, optionally highlighted.
    Item { text: String, highlight: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub heading: String,
    pub blocks: Vec<ReportBlock>,
}

impl ReportSection {
    fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            blocks: Vec::new(),
        }
    }

    fn field(mut self, label: &str, value: Option<&str>) -> Self {
        self.blocks.push(ReportBlock::Field {
            label: label.to_string(),
            value: or_placeholder(value),
        });
        self
    }

    fn paragraph(mut self, text: Option<&str>) -> Self {
        self.blocks.push(ReportBlock::Paragraph(or_placeholder(text)));
        self
    }

    fn item(mut self, text: String, highlight: bool) -> Self {
        self.blocks.push(ReportBlock::Item { text, highlight });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub title: String,
    /// Suggested file stem, e.g. `Analysis_Patient_fall`.
    pub file_stem: String,
    pub sections: Vec<ReportSection>,
}

/// Everything the report reads, loaded by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub card: &'a Card,
    pub causes: &'a [CauseNode],
    pub failure_modes: &'a [FailureModeRecord],
    pub actions: &'a [ActionItem],
    pub pdca: Option<&'a PdcaCycle>,
}

fn or_placeholder(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

fn non_blank(value: &str) -> Option<&str> {
    Some(value).filter(|value| !value.trim().is_empty())
}

fn file_stem(title: &str) -> String {
    let base = non_blank(title).unwrap_or("event");
    let short: String = base.trim().chars().take(MAX_FILE_STEM_CHARS).collect();
    let joined = short.split_whitespace().collect::<Vec<_>>().join("_");
    format!("Analysis_{joined}")
}

fn investigation_sections(card: &Card) -> Vec<ReportSection> {
    let pct = &card.pct;
    let notification_date = pct
        .notification_date
        .as_deref()
        .or(card.created_at.as_deref())
        .map(|value| value.get(..10).unwrap_or(value));
    let system = pct
        .notification_system
        .as_deref()
        .and_then(non_blank)
        .unwrap_or(PctFields::DEFAULT_NOTIFICATION_SYSTEM);

    vec![
        ReportSection::new("Patient")
            .field("Name", pct.patient_name.as_deref())
            .field("Date of birth", pct.patient_dob.as_deref()),
        ReportSection::new(format!(
            "Event No. {}",
            or_placeholder(pct.event_code.as_deref())
        ))
        .field("Event date", card.date.as_deref())
        .field("Notification date", notification_date)
        .field("Unit", Some(card.unit.as_str()))
        .field("Severity", Some(card.severity.label())),
        ReportSection::new(format!("Notification ({system})")).paragraph(
            pct.notification_text
                .as_deref()
                .and_then(non_blank)
                .or(Some(card.desc.as_str())),
        ),
        ReportSection::new("Event chronology").paragraph(pct.chronology_text.as_deref()),
        ReportSection::new("Patient outcome").paragraph(pct.outcome_text.as_deref()),
        ReportSection::new("Interview").paragraph(pct.interview_text.as_deref()),
        ReportSection::new("Investigation team").paragraph(pct.investigation_team.as_deref()),
        ReportSection::new("Risk management conclusion")
            .paragraph(pct.conclusion_text.as_deref()),
    ]
}

fn cause_section(causes: &[CauseNode], root_cause_id: Option<&str>) -> ReportSection {
    let mut section = ReportSection::new("Cause analysis (6M)");
    for group in group_causes(causes) {
        if group.causes.is_empty() {
            continue;
        }
        section = section.item(group.label().to_string(), false);
        for cause in group.causes {
            let is_root = root_cause_id == Some(cause.id.as_str());
            let text = if is_root {
                format!("[ROOT CAUSE] {}", cause.text)
            } else {
                cause.text.clone()
            };
            section = section.item(text, is_root);
        }
    }
    section
}

fn failure_mode_section(records: &[FailureModeRecord]) -> Option<ReportSection> {
    if records.is_empty() {
        return None;
    }
    let mut ranked: Vec<&FailureModeRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.hazard_score.cmp(&a.hazard_score));

    let mut section = ReportSection::new("Failure mode analysis (HFMEA)");
    for (index, record) in ranked.into_iter().take(MAX_REPORTED_FAILURE_MODES).enumerate() {
        section = section
            .item(
                format!(
                    "{}. {} (hazard score {}, {})",
                    index + 1,
                    or_placeholder(Some(record.step.as_str())),
                    record.hazard_score,
                    record.risk_level.label()
                ),
                record.decision == DecisionStatus::Action,
            )
            .field("Failure mode", Some(record.failure_mode.as_str()))
            .field("Cause", Some(record.cause.as_str()))
            .field("Effect", Some(record.effect.as_str()))
            .field("Controls", Some(record.controls.as_str()))
            .field("Decision", Some(record.decision_text.as_str()))
            .field("Action", Some(record.action.as_str()))
            .field("Owner", Some(record.owner.as_str()))
            .field("Due", record.due.as_deref());
    }
    Some(section)
}

fn action_plan_section(actions: &[ActionItem]) -> ReportSection {
    let mut section = ReportSection::new("Action plan (5W2H)");
    for (index, action) in actions.iter().enumerate() {
        section = section
            .item(format!("{}. {}", index + 1, action.what), false)
            .field("Why", Some(action.why.as_str()))
            .field("Who", Some(action.who.as_str()))
            .field("Where", Some(action.where_.as_str()))
            .field("When", action.when.as_deref())
            .field("How", Some(action.how.as_str()))
            .field("How much", Some(action.how_much.as_str()))
            .field("Status", Some(action.status.as_str()));
    }
    section
}

fn pdca_section(pdca: Option<&PdcaCycle>) -> ReportSection {
    let blank = PdcaCycle::default();
    let pdca = pdca.unwrap_or(&blank);
    [PdcaStage::Plan, PdcaStage::Do, PdcaStage::Check, PdcaStage::Act]
        .into_iter()
        .fold(ReportSection::new("PDCA cycle"), |section, stage| {
            section
                .item(stage.label().to_string(), stage == pdca.stage)
                .paragraph(Some(pdca.text_for(stage)))
        })
}

/// Builds the case report for one card.
pub fn build_case_report(inputs: ReportInputs<'_>) -> CaseReport {
    let card = inputs.card;
    let title = if card.is_event() {
        "Event analysis"
    } else {
        "Card report"
    };

    let mut sections = vec![ReportSection::new("Summary")
        .field("Title", Some(card.title.as_str()))
        .field("Type", Some(card.kind.label()))
        .field("Unit", Some(card.unit.as_str()))
        .field("Date", card.date.as_deref())];

    if card.is_event() {
        sections.extend(investigation_sections(card));
    } else {
        sections.push(ReportSection::new("Description").paragraph(Some(card.desc.as_str())));
    }

    sections.push(cause_section(inputs.causes, card.root_cause_id.as_deref()));
    sections.extend(failure_mode_section(inputs.failure_modes));
    sections.push(action_plan_section(inputs.actions));
    sections.push(pdca_section(inputs.pdca));

    CaseReport {
        title: title.to_string(),
        file_stem: file_stem(&card.title),
        sections,
    }
}

/// Renders a case report into a concrete document format.
pub trait ReportExporter {
    type Output;
    type Error: std::fmt::Display;

    fn export(&self, report: &CaseReport) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExporter;

impl ReportExporter for PlainTextExporter {
    type Output = String;
    type Error = fmt::Error;

    fn export(&self, report: &CaseReport) -> Result<String, fmt::Error> {
        let mut out = String::new();
        write_plain_text(report, &mut out)?;
        Ok(out)
    }
}

fn write_plain_text(report: &CaseReport, out: &mut impl Write) -> fmt::Result {
    writeln!(out, "{}", report.title.to_uppercase())?;
    for section in &report.sections {
        writeln!(out, "\n{}", section.heading.to_uppercase())?;
        for block in &section.blocks {
            match block {
                ReportBlock::Field { label, value } => writeln!(out, "  {label}: {value}")?,
                ReportBlock::Paragraph(text) => writeln!(out, "    {text}")?,
                ReportBlock::Item { text, highlight } => {
                    writeln!(out, "{} {text}", if *highlight { "*" } else { "-" })?
                }
            }
        }
    }
    Ok(())
}
