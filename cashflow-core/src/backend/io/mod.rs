//! # IO Module
//!
//! Translation layer between the collaborator DTOs defined in the `shared`
//! crate and the domain types. Mapping is where raw backend values are
//! interpreted: dates parsed, text targets converted, blank categories
//! resolved, and unusable fetch responses rejected as decoding failures.

pub mod mappers;

pub use mappers::*;
