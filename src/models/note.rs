// src/models/note.rs
// DOCUMENTATION: Travel notes and checklist items attached to a trip
// PURPOSE: Stored as the `travelNotes` array of the trip document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelNote {
    /// UUID for notes created here; older documents carry millisecond timestamps
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_checklist: bool,
    pub created_at: DateTime<Utc>,
}

impl TravelNote {
    pub fn new(text: &str, is_checklist: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.trim().to_string(),
            completed: false,
            is_checklist,
            created_at: Utc::now(),
        }
    }
}

/// POST /trips/{id}/notes
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[serde(default)]
    pub is_checklist: bool,
}

/// PUT /trips/{id}/notes/{note_id}
/// DOCUMENTATION: Every field is optional; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub is_checklist: Option<bool>,
}
