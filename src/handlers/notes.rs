// src/handlers/notes.rs
// DOCUMENTATION: Travel note handlers
// PURPOSE: Mounted under /trips by the trips scope

use crate::errors::TripError;
use crate::models::{CreateNoteRequest, UpdateNoteRequest};
use crate::services::NotesService;
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

/// GET /trips/{id}/notes
pub async fn list_notes(
    notes: web::Data<NotesService>,
    path: web::Path<String>,
) -> Result<impl Responder, TripError> {
    let list = notes.list(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(list))
}

/// POST /trips/{id}/notes
pub async fn add_note(
    notes: web::Data<NotesService>,
    path: web::Path<String>,
    req: web::Json<CreateNoteRequest>,
) -> Result<impl Responder, TripError> {
    if let Err(e) = req.validate() {
        return Err(TripError::ValidationError(e.to_string()));
    }

    let note = notes.add(&path.into_inner(), &req).await?;
    Ok(HttpResponse::Created().json(note))
}

/// PUT /trips/{id}/notes/{note_id}
/// Edit text, toggle completed or toggle checklist
pub async fn update_note(
    notes: web::Data<NotesService>,
    path: web::Path<(String, String)>,
    req: web::Json<UpdateNoteRequest>,
) -> Result<impl Responder, TripError> {
    if let Err(e) = req.validate() {
        return Err(TripError::ValidationError(e.to_string()));
    }

    let (trip_id, note_id) = path.into_inner();
    let note = notes.update(&trip_id, &note_id, &req).await?;
    Ok(HttpResponse::Ok().json(note))
}

/// DELETE /trips/{id}/notes/{note_id}
pub async fn delete_note(
    notes: web::Data<NotesService>,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, TripError> {
    let (trip_id, note_id) = path.into_inner();
    notes.delete(&trip_id, &note_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/{id}/notes", web::get().to(list_notes))
        .route("/{id}/notes", web::post().to(add_note))
        .route("/{id}/notes/{note_id}", web::put().to(update_note))
        .route("/{id}/notes/{note_id}", web::delete().to(delete_note));
}
