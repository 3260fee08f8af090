//! Canvas session storage.

use super::{ensure_schema, int_to_bool, RepoError, RepoResult, SchemaRequirement};
use crate::model::session::{SessionId, ToolKind, ToolSession};
use crate::model::ValidationError;
use rusqlite::{params, Connection, Row};

const SESSION_SELECT_SQL: &str = "SELECT
    id, title, tool_type, created_by, created_at, root_cause_id, root_cause_pinned, ishikawa_effect
FROM tool_sessions";

const REQUIRED_SCHEMA: &[SchemaRequirement] = &[(
    "tool_sessions",
    &["id", "title", "tool_type", "created_at", "root_cause_id"],
)];

pub trait SessionRepository {
    fn create_session(&self, session: &ToolSession) -> RepoResult<SessionId>;
    fn get_session(&self, id: &str) -> RepoResult<Option<ToolSession>>;
    /// Newest first.
    fn list_sessions(&self) -> RepoResult<Vec<ToolSession>>;
    /// Removes the session and, by cascade, all of its tool records.
    fn delete_session(&self, id: &str) -> RepoResult<()>;
}

pub struct SqliteSessionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSessionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn create_session(&self, session: &ToolSession) -> RepoResult<SessionId> {
        if session.title.trim().is_empty() {
            return Err(ValidationError::EmptySessionTitle.into());
        }
        self.conn.execute(
            "INSERT INTO tool_sessions (id, title, tool_type, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                session.id,
                session.title.trim(),
                session.tool_type.as_str(),
                session.created_by,
                session.created_at,
            ],
        )?;
        Ok(session.id.clone())
    }

    fn get_session(&self, id: &str) -> RepoResult<Option<ToolSession>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SESSION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_session_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_sessions(&self) -> RepoResult<Vec<ToolSession>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SESSION_SELECT_SQL} ORDER BY created_at DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next()? {
            sessions.push(parse_session_row(row)?);
        }
        Ok(sessions)
    }

    fn delete_session(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tool_sessions WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("tool session", id));
        }
        Ok(())
    }
}

fn parse_session_row(row: &Row<'_>) -> RepoResult<ToolSession> {
    let tool_text: String = row.get("tool_type")?;
    let tool_type = ToolKind::parse(&tool_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid tool type `{tool_text}` in tool_sessions.tool_type"
        ))
    })?;
    Ok(ToolSession {
        id: row.get("id")?,
        title: row.get("title")?,
        tool_type,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        root_cause_id: row.get("root_cause_id")?,
        root_cause_pinned: int_to_bool(
            row.get("root_cause_pinned")?,
            "tool_sessions.root_cause_pinned",
        )?,
        ishikawa_effect: row.get("ishikawa_effect")?,
    })
}
