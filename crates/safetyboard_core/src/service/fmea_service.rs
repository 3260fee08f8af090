//! HFMEA table use cases for cards and canvas sessions.

use super::{Actor, ToolServiceError};
use crate::model::failure_mode::{
    FailureModeDraft, FailureModePreview, FailureModeRecord, ProbabilityCategory,
    SeverityCategory,
};
use crate::model::session::{ToolKind, ToolOwner};
use crate::repo::analysis_repo::AnalysisRepository;
use log::info;

pub type FmeaResult<T> = Result<T, ToolServiceError>;

/// Starter rows offered on an empty table.
fn template_drafts() -> [FailureModeDraft; 2] {
    [
        FailureModeDraft {
            step: "Care process".to_string(),
            failure_mode: "Communication failure within the team".to_string(),
            cause: "Incomplete handover".to_string(),
            effect: "Delayed or wrong care".to_string(),
            severity_cat: SeverityCategory::Major,
            prob_cat: ProbabilityCategory::Occasional,
            single_point: false,
            control_effective: false,
            detectable: true,
            ..FailureModeDraft::default()
        },
        FailureModeDraft {
            step: "Documentation".to_string(),
            failure_mode: "Incomplete event record".to_string(),
            cause: "No mandatory fields".to_string(),
            effect: "Investigation lacks evidence".to_string(),
            severity_cat: SeverityCategory::Moderate,
            prob_cat: ProbabilityCategory::Occasional,
            single_point: false,
            control_effective: false,
            detectable: true,
            ..FailureModeDraft::default()
        },
    ]
}

pub struct FmeaService<R: AnalysisRepository> {
    repo: R,
}

impl<R: AnalysisRepository> FmeaService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Live score, tier and decision for a form being edited.
    pub fn preview(&self, draft: &FailureModeDraft) -> FailureModePreview {
        draft.preview()
    }

    /// Freezes `draft` with its derived decision and appends it.
    pub fn add(
        &self,
        owner: &ToolOwner,
        draft: &FailureModeDraft,
        actor: &Actor,
    ) -> FmeaResult<FailureModeRecord> {
        draft.validate()?;
        let record = FailureModeRecord::from_draft(draft, actor.user.clone(), actor.timestamp());
        self.repo.add_failure_mode(owner, &record)?;
        self.repo.mark_tool_used(owner, ToolKind::Fmea)?;
        info!(
            "event=fmea_add module=fmea status=ok owner={} hazard_score={} decision={}",
            owner,
            record.hazard_score,
            record.decision.as_str()
        );
        Ok(record)
    }

    /// Rows ordered by hazard score, highest first.
    pub fn list(&self, owner: &ToolOwner) -> FmeaResult<Vec<FailureModeRecord>> {
        Ok(self.repo.list_failure_modes(owner)?)
    }

    pub fn delete(&self, owner: &ToolOwner, id: &str) -> FmeaResult<()> {
        self.repo.delete_failure_mode(owner, id)?;
        Ok(())
    }

    /// Appends the starter rows.
    pub fn generate_template(
        &self,
        owner: &ToolOwner,
        actor: &Actor,
    ) -> FmeaResult<Vec<FailureModeRecord>> {
        template_drafts()
            .iter()
            .map(|draft| self.add(owner, draft, actor))
            .collect()
    }
}
