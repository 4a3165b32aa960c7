//! Tracker abstraction.
//!
//! This module provides a `TrackerApi` trait covering everything the pipeline
//! needs from a Gazelle-style music tracker: session setup, candidate
//! discovery, group metadata, the 24-bit relabel edit and uploads.

mod gazelle;
mod types;

pub use gazelle::GazelleClient;
pub use types::*;
