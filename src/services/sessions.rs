// src/services/sessions.rs
// DOCUMENTATION: In-memory trip state for the running process
// PURPOSE: Holds the optimistic view of each trip that enrichment mutates before
// (and regardless of) the persisted write

use crate::db::TripStore;
use crate::errors::TripError;
use crate::models::Trip;
use crate::services::cache::Sweepable;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Session {
    trip: Trip,
    loaded_at: Instant,
}

impl Session {
    fn new(trip: Trip) -> Self {
        Self {
            trip,
            loaded_at: Instant::now(),
        }
    }
}

/// Trips loaded or modified during this process's lifetime
/// DOCUMENTATION: An entry lives for the TTL counted from when it was loaded, not
/// from its last use, so a busy trip still picks up writes made elsewhere. Expired
/// entries are invisible and the next access reloads from the store.
pub struct TripSessions {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl TripSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_fresh(&self, session: &Session) -> bool {
        session.loaded_at.elapsed() < self.ttl
    }

    pub async fn get(&self, id: &str) -> Option<Trip> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|session| self.is_fresh(session))
            .map(|session| session.trip.clone())
    }

    pub async fn insert(&self, trip: Trip) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(trip.id.clone(), Session::new(trip));
    }

    /// Keep a fresh existing session, otherwise adopt `trip`; returns the session's view
    pub async fn get_or_insert(&self, trip: Trip) -> Trip {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&trip.id).filter(|s| self.is_fresh(s)) {
            return session.trip.clone();
        }
        sessions.insert(trip.id.clone(), Session::new(trip.clone()));
        trip
    }

    /// Session view of a trip, loading it from the store on first access
    pub async fn load(&self, store: &dyn TripStore, id: &str) -> Result<Option<Trip>, TripError> {
        if let Some(trip) = self.get(id).await {
            return Ok(Some(trip));
        }
        match store.get_trip(id).await? {
            Some(trip) => Ok(Some(self.get_or_insert(trip).await)),
            None => Ok(None),
        }
    }

    /// Mutate a session in place; `None` when the trip has no fresh session
    pub async fn modify<R>(&self, id: &str, f: impl FnOnce(&mut Trip) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).filter(|s| s.loaded_at.elapsed() < self.ttl)?;
        Some(f(&mut session.trip))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

#[async_trait]
impl Sweepable for TripSessions {
    async fn sweep(&self) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, s| s.loaded_at.elapsed() < ttl);
        if sessions.len() < before {
            log::info!("Dropped {} expired trip sessions", before - sessions.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryTripStore;
    use serde_json::{json, Map};

    fn trip(id: &str) -> Trip {
        Trip {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_or_insert_keeps_existing() {
        let sessions = TripSessions::new(Duration::from_secs(60));
        sessions.insert(trip("1")).await;
        sessions
            .modify("1", |t| t.user_email = Some("kept@example.com".to_string()))
            .await;

        let view = sessions.get_or_insert(trip("1")).await;
        assert_eq!(view.user_email.as_deref(), Some("kept@example.com"));
        assert!(sessions.modify("missing", |_| ()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_do_not_extend_lifetime() {
        let store = MemoryTripStore::new();
        let mut stored = trip("1");
        stored.user_email = Some("old@example.com".to_string());
        store.create_trip(&stored).await.unwrap();

        let sessions = TripSessions::new(Duration::from_secs(60));
        sessions.load(&store, "1").await.unwrap();

        let mut fields = Map::new();
        fields.insert("userEmail".to_string(), json!("new@example.com"));
        store.update_trip_fields("1", fields).await.unwrap();

        tokio::time::advance(Duration::from_secs(40)).await;
        let cached = sessions.load(&store, "1").await.unwrap().unwrap();
        assert_eq!(cached.user_email.as_deref(), Some("old@example.com"));

        tokio::time::advance(Duration::from_secs(21)).await;
        assert!(sessions.get("1").await.is_none());
        let reloaded = sessions.load(&store, "1").await.unwrap().unwrap();
        assert_eq!(reloaded.user_email.as_deref(), Some("new@example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_swept() {
        let sessions = TripSessions::new(Duration::from_secs(60));
        sessions.insert(trip("1")).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        sessions.sweep().await;
        assert_eq!(sessions.len().await, 0);
    }
}
