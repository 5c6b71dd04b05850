// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export handler components

pub mod admin;
pub mod health;
pub mod notes;
pub mod photos;
pub mod trips;

pub use admin::config as admin_config;
pub use health::config as health_config;
pub use photos::config as photos_config;
pub use trips::config as trips_config;
