// src/services/notes.rs
// DOCUMENTATION: Travel notes and checklist items
// PURPOSE: List / add / edit / toggle / delete, persisted as the trip's `travelNotes`

use crate::db::TripStore;
use crate::errors::TripError;
use crate::models::{CreateNoteRequest, TravelNote, UpdateNoteRequest};
use crate::services::sessions::TripSessions;
use serde_json::Map;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct NotesService {
    store: Arc<dyn TripStore>,
    sessions: Arc<TripSessions>,
    /// Serializes read-modify-write of note lists
    write_lock: Mutex<()>,
}

impl NotesService {
    pub fn new(store: Arc<dyn TripStore>, sessions: Arc<TripSessions>) -> Self {
        Self {
            store,
            sessions,
            write_lock: Mutex::new(()),
        }
    }

    async fn current_notes(&self, trip_id: &str) -> Result<Vec<TravelNote>, TripError> {
        self.sessions
            .load(self.store.as_ref(), trip_id)
            .await?
            .map(|trip| trip.travel_notes)
            .ok_or_else(|| TripError::NotFound(format!("Trip {} not found", trip_id)))
    }

    /// Persist first; the session only changes once the store accepted the list
    async fn save(&self, trip_id: &str, notes: Vec<TravelNote>) -> Result<(), TripError> {
        let encoded = serde_json::to_value(&notes)
            .map_err(|e| TripError::InvalidInput(format!("Notes cannot be serialized: {}", e)))?;
        let mut fields = Map::new();
        fields.insert("travelNotes".to_string(), encoded);
        self.store.update_trip_fields(trip_id, fields).await?;

        self.sessions
            .modify(trip_id, |trip| trip.travel_notes = notes)
            .await;
        Ok(())
    }

    pub async fn list(&self, trip_id: &str) -> Result<Vec<TravelNote>, TripError> {
        self.current_notes(trip_id).await
    }

    pub async fn add(&self, trip_id: &str, req: &CreateNoteRequest) -> Result<TravelNote, TripError> {
        let text = req.text.trim();
        if text.is_empty() {
            return Err(TripError::ValidationError("Note text is empty".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut notes = self.current_notes(trip_id).await?;
        let note = TravelNote::new(text, req.is_checklist);
        notes.push(note.clone());
        self.save(trip_id, notes).await?;

        log::info!("Added note {} to trip {}", note.id, trip_id);
        Ok(note)
    }

    /// Edit text and/or set completed / checklist flags
    pub async fn update(
        &self,
        trip_id: &str,
        note_id: &str,
        req: &UpdateNoteRequest,
    ) -> Result<TravelNote, TripError> {
        let _guard = self.write_lock.lock().await;
        let mut notes = self.current_notes(trip_id).await?;
        let note = notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| TripError::NotFound(format!("Note {} not found", note_id)))?;

        if let Some(text) = req.text.as_deref().map(str::trim) {
            if text.is_empty() {
                return Err(TripError::ValidationError("Note text is empty".to_string()));
            }
            note.text = text.to_string();
        }
        if let Some(completed) = req.completed {
            note.completed = completed;
        }
        if let Some(is_checklist) = req.is_checklist {
            note.is_checklist = is_checklist;
        }

        let updated = note.clone();
        self.save(trip_id, notes).await?;
        Ok(updated)
    }

    pub async fn delete(&self, trip_id: &str, note_id: &str) -> Result<(), TripError> {
        let _guard = self.write_lock.lock().await;
        let mut notes = self.current_notes(trip_id).await?;
        let before = notes.len();
        notes.retain(|n| n.id != note_id);
        if notes.len() == before {
            return Err(TripError::NotFound(format!("Note {} not found", note_id)));
        }
        self.save(trip_id, notes).await?;
        log::info!("Deleted note {} from trip {}", note_id, trip_id);
        Ok(())
    }
}
