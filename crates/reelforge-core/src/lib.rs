//! ReelForge Core Library
//!
//! AI-driven short-film production engine.
//! This library contains the script planning agents, the continuity and
//! storyboard pipeline, and the relay gateway used for text, image, video,
//! and music generation.

pub mod core;

pub use crate::core::{CoreError, CoreResult};
