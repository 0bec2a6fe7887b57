//! Watcher Service Library
//!
//! Runs the scene-to-webhook pipeline for tracked regions: resolve the
//! region's bounding box, find the freshest catalog scene, download and
//! tile one spectral band, ask a language model for an interpretation,
//! then deliver and record the resulting event.

pub mod analysis;
pub mod config;
pub mod events;
pub mod notify;
pub mod pipeline;
pub mod staging;
