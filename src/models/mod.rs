// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export model components

pub mod marker;
pub mod note;
pub mod trip;

pub use marker::*;
pub use note::*;
pub use trip::*;
