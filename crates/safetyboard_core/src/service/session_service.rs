//! Canvas session use cases.

use super::{Actor, ToolServiceError};
use crate::model::session::{ToolKind, ToolSession};
use crate::repo::session_repo::SessionRepository;
use log::info;

pub struct SessionService<R: SessionRepository> {
    repo: R,
}

impl<R: SessionRepository> SessionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create(
        &self,
        title: &str,
        tool: ToolKind,
        actor: &Actor,
    ) -> Result<ToolSession, ToolServiceError> {
        let session = ToolSession::new(title, tool, actor.user.clone(), actor.timestamp())?;
        self.repo.create_session(&session)?;
        info!(
            "event=session_create module=session status=ok session_id={} tool={}",
            session.id,
            tool.as_str()
        );
        Ok(session)
    }

    pub fn list(&self) -> Result<Vec<ToolSession>, ToolServiceError> {
        Ok(self.repo.list_sessions()?)
    }

    pub fn get(&self, id: &str) -> Result<ToolSession, ToolServiceError> {
        self.repo
            .get_session(id)?
            .ok_or_else(|| ToolServiceError::NotFound {
                entity: "tool session",
                id: id.to_string(),
            })
    }

    /// Deletes the session with all of its tool records.
    pub fn delete(&self, id: &str) -> Result<(), ToolServiceError> {
        self.repo.delete_session(id)?;
        info!("event=session_delete module=session status=ok session_id={id}");
        Ok(())
    }
}
