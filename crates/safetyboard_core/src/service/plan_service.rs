//! 5W2H action plan, PDCA cycle and notes canvas use cases.

use super::{Actor, ToolServiceError};
use crate::model::action_plan::{ActionItem, ActionItemInput};
use crate::model::pdca::PdcaCycle;
use crate::model::session::{NotesDoc, ToolKind, ToolOwner};
use crate::repo::analysis_repo::AnalysisRepository;
use log::info;

pub type PlanResult<T> = Result<T, ToolServiceError>;

pub struct PlanService<R: AnalysisRepository> {
    repo: R,
}

impl<R: AnalysisRepository> PlanService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn add_action(
        &self,
        owner: &ToolOwner,
        input: &ActionItemInput,
        actor: &Actor,
    ) -> PlanResult<ActionItem> {
        let item = ActionItem::from_input(input, actor.user.clone(), actor.timestamp())?;
        self.repo.add_action_item(owner, &item)?;
        self.repo.mark_tool_used(owner, ToolKind::ActionPlan)?;
        info!("event=action_add module=plan status=ok owner={owner} item_id={}", item.id);
        Ok(item)
    }

    pub fn actions(&self, owner: &ToolOwner) -> PlanResult<Vec<ActionItem>> {
        Ok(self.repo.list_action_items(owner)?)
    }

    pub fn set_action_status(&self, owner: &ToolOwner, id: &str, status: &str) -> PlanResult<()> {
        self.repo.update_action_status(owner, id, status)?;
        Ok(())
    }

    pub fn delete_action(&self, owner: &ToolOwner, id: &str) -> PlanResult<()> {
        self.repo.delete_action_item(owner, id)?;
        Ok(())
    }

    /// Stored cycle, or a blank one at the plan stage.
    pub fn pdca(&self, owner: &ToolOwner) -> PlanResult<PdcaCycle> {
        Ok(self.repo.get_pdca(owner)?.unwrap_or_default())
    }

    pub fn save_pdca(
        &self,
        owner: &ToolOwner,
        cycle: &PdcaCycle,
        actor: &Actor,
    ) -> PlanResult<PdcaCycle> {
        let stamped = PdcaCycle {
            updated_by: actor.user.clone(),
            updated_at: Some(actor.timestamp()),
            ..cycle.clone()
        };
        self.repo.save_pdca(owner, &stamped)?;
        self.repo.mark_tool_used(owner, ToolKind::Pdca)?;
        info!(
            "event=pdca_save module=plan status=ok owner={owner} stage={}",
            stamped.stage.as_str()
        );
        Ok(stamped)
    }

    pub fn notes(&self, owner: &ToolOwner) -> PlanResult<NotesDoc> {
        Ok(self.repo.get_notes(owner)?.unwrap_or_default())
    }

    pub fn save_notes(&self, owner: &ToolOwner, text: &str, actor: &Actor) -> PlanResult<NotesDoc> {
        let notes = NotesDoc {
            text: text.to_string(),
            updated_by: actor.user.clone(),
            updated_at: Some(actor.timestamp()),
        };
        self.repo.save_notes(owner, &notes)?;
        Ok(notes)
    }
}
