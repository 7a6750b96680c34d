//! ReelForge Production Engine
//!
//! Core production module.
//! Handles script planning, visual continuity, storyboard rendering, video
//! clip generation, music, and project persistence.

pub mod classify;
pub mod continuity;
pub mod fs;
pub mod gateway;
pub mod project;
pub mod retry;
pub mod script;
pub mod settings;
pub mod studio;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
