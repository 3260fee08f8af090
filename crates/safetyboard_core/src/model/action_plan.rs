//! 5W2H action plan entries.

use super::{new_record_key, non_empty, ValidationError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ACTION_STATUS: &str = "planned";

/// User input for one action plan entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionItemInput {
    pub what: String,
    pub who: String,
    pub why: String,
    pub where_: String,
    pub when: Option<String>,
    pub how: String,
    pub how_much: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    #[serde(default)]
    pub id: String,
    pub what: String,
    pub who: String,
    pub why: String,
    #[serde(rename = "where")]
    pub where_: String,
    /// Due date (ISO `YYYY-MM-DD`).
    pub when: Option<String>,
    pub how: String,
    #[serde(rename = "howmuch")]
    pub how_much: String,
    pub status: String,
    pub created_by: Option<String>,
    pub created_at: String,
}

impl ActionItem {
    pub fn from_input(
        input: &ActionItemInput,
        created_by: Option<String>,
        created_at: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let what = input.what.trim();
        if what.is_empty() {
            return Err(ValidationError::EmptyActionWhat);
        }
        Ok(Self {
            id: new_record_key(),
            what: what.to_string(),
            who: input.who.trim().to_string(),
            why: input.why.trim().to_string(),
            where_: input.where_.trim().to_string(),
            when: non_empty(input.when.as_deref()),
            how: input.how.trim().to_string(),
            how_much: input.how_much.trim().to_string(),
            status: DEFAULT_ACTION_STATUS.to_string(),
            created_by,
            created_at: created_at.into(),
        })
    }
}
