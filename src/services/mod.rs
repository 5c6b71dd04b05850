// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod backfill;
pub mod budget;
pub mod cache;
pub mod clustering;
pub mod coordinates;
pub mod essentials;
pub mod google_places_client;
pub mod marker_builder;
pub mod notes;
pub mod photo_resolver;
pub mod places_lookup;
pub mod sessions;
pub mod trip_service;
pub mod usage;

#[cfg(test)]
pub mod testing;

pub use backfill::*;
pub use budget::*;
pub use cache::*;
pub use clustering::*;
pub use essentials::*;
pub use google_places_client::*;
pub use marker_builder::*;
pub use notes::*;
pub use photo_resolver::*;
pub use places_lookup::*;
pub use sessions::*;
pub use trip_service::*;
pub use usage::*;
