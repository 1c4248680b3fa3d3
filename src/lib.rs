//! Explainer - prompt to animated explainer video
//!
//! Pipeline stages, in run order: prompt sanitizing, scene-code generation,
//! scene materialization, rendering, narration, speech synthesis and the
//! sign-language video.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod media;
pub mod prompt;
pub mod render;
pub mod scene;
pub mod sign_language;
pub mod speech;
pub mod workflow;
