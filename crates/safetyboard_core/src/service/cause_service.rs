//! Cause-and-effect diagram use cases.
//!
//! # Invariants
//! - After any cause mutation the stored root cause matches the resolved
//!   selection, unless a human pin is still valid.
//! - Pinning only accepts an existing cause of the same owner.

use super::{Actor, ToolServiceError};
use crate::engine::root_cause::{group_causes, resolve_root_cause, RootCauseSelection};
use crate::model::cause::{CauseCategory, CauseNode};
use crate::model::session::{ToolKind, ToolOwner};
use crate::repo::analysis_repo::AnalysisRepository;
use log::info;

pub type CauseResult<T> = Result<T, ToolServiceError>;

/// Owned diagram bone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBone {
    pub category: Option<CauseCategory>,
    pub label: &'static str,
    pub total_impact: u64,
    pub causes: Vec<CauseNode>,
}

/// Full diagram state of one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagram {
    pub bones: Vec<DiagramBone>,
    pub root_cause: RootCauseSelection,
}

pub struct CauseService<R: AnalysisRepository> {
    repo: R,
}

impl<R: AnalysisRepository> CauseService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn add_cause(
        &self,
        owner: &ToolOwner,
        category: Option<CauseCategory>,
        text: &str,
        impact: u32,
        actor: &Actor,
    ) -> CauseResult<CauseNode> {
        let cause = CauseNode::new(category, text, impact, actor.user.clone(), actor.timestamp())?;
        self.repo.add_cause(owner, &cause)?;
        self.repo.mark_tool_used(owner, ToolKind::Ishikawa)?;
        self.refresh_root_cause(owner)?;
        info!(
            "event=cause_add module=ishikawa status=ok owner={} category={}",
            owner,
            category.map(CauseCategory::as_str).unwrap_or("none")
        );
        Ok(cause)
    }

    pub fn causes(&self, owner: &ToolOwner) -> CauseResult<Vec<CauseNode>> {
        Ok(self.repo.list_causes(owner)?)
    }

    /// Drag between bones; `None` returns the cause to the unsorted pool.
    pub fn move_cause(
        &self,
        owner: &ToolOwner,
        cause_id: &str,
        category: Option<CauseCategory>,
    ) -> CauseResult<RootCauseSelection> {
        self.repo.update_cause_category(owner, cause_id, category)?;
        self.refresh_root_cause(owner)
    }

    pub fn set_impact(
        &self,
        owner: &ToolOwner,
        cause_id: &str,
        impact: u32,
    ) -> CauseResult<RootCauseSelection> {
        self.repo.update_cause_impact(owner, cause_id, impact)?;
        self.refresh_root_cause(owner)
    }

    pub fn delete_cause(&self, owner: &ToolOwner, cause_id: &str) -> CauseResult<RootCauseSelection> {
        self.repo.delete_cause(owner, cause_id)?;
        self.refresh_root_cause(owner)
    }

    /// Designates `cause_id` by hand and disables automatic suggestion.
    pub fn pin_root_cause(&self, owner: &ToolOwner, cause_id: &str) -> CauseResult<()> {
        let causes = self.repo.list_causes(owner)?;
        if !causes.iter().any(|cause| cause.id == cause_id) {
            return Err(ToolServiceError::NotFound {
                entity: "cause",
                id: cause_id.to_string(),
            });
        }
        self.repo.set_root_cause(owner, Some(cause_id), true)?;
        info!("event=root_cause_pin module=ishikawa status=ok owner={owner} cause_id={cause_id}");
        Ok(())
    }

    /// Returns to automatic suggestion.
    pub fn unpin_root_cause(&self, owner: &ToolOwner) -> CauseResult<RootCauseSelection> {
        let state = self.repo.root_cause_state(owner)?;
        self.repo
            .set_root_cause(owner, state.root_cause_id.as_deref(), false)?;
        self.refresh_root_cause(owner)
    }

    /// Re-resolves the root cause and stores a changed suggestion.
    pub fn refresh_root_cause(&self, owner: &ToolOwner) -> CauseResult<RootCauseSelection> {
        let causes = self.repo.list_causes(owner)?;
        let state = self.repo.root_cause_state(owner)?;
        let selection = resolve_root_cause(&causes, state.root_cause_id.as_deref(), state.pinned);
        if !selection.is_pinned()
            && (state.pinned || state.root_cause_id.as_deref() != selection.cause_id())
        {
            self.repo
                .set_root_cause(owner, selection.cause_id(), false)?;
        }
        Ok(selection)
    }

    pub fn diagram(&self, owner: &ToolOwner) -> CauseResult<Diagram> {
        let causes = self.repo.list_causes(owner)?;
        let state = self.repo.root_cause_state(owner)?;
        let root_cause = resolve_root_cause(&causes, state.root_cause_id.as_deref(), state.pinned);
        let bones = group_causes(&causes)
            .into_iter()
            .map(|group| DiagramBone {
                category: group.category,
                label: group.label(),
                total_impact: group.total_impact(),
                causes: group.causes.into_iter().cloned().collect(),
            })
            .collect();
        Ok(Diagram { bones, root_cause })
    }

    /// Overrides the generated effect label; blank clears the override.
    pub fn set_custom_effect(&self, owner: &ToolOwner, label: &str) -> CauseResult<()> {
        self.repo.set_effect_label(owner, Some(label))?;
        Ok(())
    }
}
