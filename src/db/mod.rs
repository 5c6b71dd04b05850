// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Re-export trip store implementations

pub mod memory_store;
pub mod trip_repository;

pub use memory_store::MemoryTripStore;
pub use trip_repository::{PgTripStore, TripStore};
