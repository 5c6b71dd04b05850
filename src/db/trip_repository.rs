// src/db/trip_repository.rs
// DOCUMENTATION: Trip document persistence
// PURPOSE: Read/write-one-document and query-by-owner over a JSONB table

use crate::errors::TripError;
use crate::models::Trip;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool};

/// Document store the pipeline persists trips through
/// DOCUMENTATION: `update_trip_fields` is a shallow merge: each top-level key in
/// `fields` replaces the stored value wholesale, other keys are untouched.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn get_trip(&self, id: &str) -> Result<Option<Trip>, TripError>;

    async fn update_trip_fields(&self, id: &str, fields: Map<String, Value>)
        -> Result<(), TripError>;

    async fn query_trips_by_owner(&self, owner: &str) -> Result<Vec<Trip>, TripError>;

    /// Store a new document under `id`; fails if the id is taken
    async fn insert_document(
        &self,
        id: &str,
        owner: Option<&str>,
        document: Value,
    ) -> Result<(), TripError>;

    async fn create_trip(&self, trip: &Trip) -> Result<(), TripError> {
        let document = encode_trip(trip)?;
        self.insert_document(&trip.id, trip.user_email.as_deref(), document)
            .await
    }
}

/// Decode a stored document; the row id wins over whatever the document says
pub(crate) fn decode_trip(id: &str, document: Value) -> Result<Trip, TripError> {
    let mut trip: Trip = serde_json::from_value(document).map_err(|e| {
        log::error!("Stored trip {} is not a valid document: {}", id, e);
        TripError::DatabaseError(format!("Invalid trip document {}: {}", id, e))
    })?;
    trip.id = id.to_string();
    Ok(trip)
}

pub fn encode_trip(trip: &Trip) -> Result<Value, TripError> {
    serde_json::to_value(trip)
        .map_err(|e| TripError::InvalidInput(format!("Trip cannot be serialized: {}", e)))
}

#[derive(Debug, FromRow)]
struct TripRow {
    id: String,
    document: Value,
}

/// Postgres-backed trip store
pub struct PgTripStore {
    pool: PgPool,
}

impl PgTripStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripStore for PgTripStore {
    async fn get_trip(&self, id: &str) -> Result<Option<Trip>, TripError> {
        let row: Option<TripRow> =
            sqlx::query_as("SELECT id, document FROM ai_trips WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| decode_trip(&r.id, r.document)).transpose()
    }

    async fn update_trip_fields(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), TripError> {
        let keys: Vec<&String> = fields.keys().collect();
        log::debug!("Updating trip {} fields {:?}", id, keys);

        let result = sqlx::query(
            r#"
            UPDATE ai_trips
            SET document = document || $2,
                user_email = COALESCE($2->>'userEmail', user_email),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TripError::NotFound(format!("Trip {} not found", id)));
        }
        Ok(())
    }

    async fn query_trips_by_owner(&self, owner: &str) -> Result<Vec<Trip>, TripError> {
        let rows: Vec<TripRow> = sqlx::query_as(
            "SELECT id, document FROM ai_trips WHERE user_email = $1 ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        // one bad document should not hide the owner's other trips
        Ok(rows
            .into_iter()
            .filter_map(|r| decode_trip(&r.id, r.document).ok())
            .collect())
    }

    async fn insert_document(
        &self,
        id: &str,
        owner: Option<&str>,
        document: Value,
    ) -> Result<(), TripError> {
        sqlx::query("INSERT INTO ai_trips (id, user_email, document) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(owner)
            .bind(document)
            .execute(&self.pool)
            .await?;

        log::info!("Stored trip {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_uses_row_id() {
        let trip = decode_trip("42", json!({ "id": "stale", "tripData": { "hotels": [] } })).unwrap();
        assert_eq!(trip.id, "42");
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = decode_trip("42", json!("just text")).unwrap_err();
        assert!(matches!(err, TripError::DatabaseError(_)));
    }
}
