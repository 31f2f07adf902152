//! namer-lookup library interface
//!
//! Resolves the duration of files in the namer failed directory and
//! reconciles them with scene candidates returned by lookup sources.
//!
//! - [`duration`]: cache-first, ffprobe-fallback duration resolution
//! - [`lookup`]: source response parsing, match scoring and aggregation
//! - [`filename`]: parsing of scene file names
//! - [`db`]: SQLite file records backing the duration cache

pub mod db;
pub mod duration;
pub mod filename;
pub mod lookup;
pub mod types;

pub use crate::duration::{DurationResolver, Resolution};
pub use crate::lookup::{ResponseAggregator, ResultEntry, SourceResponse};
pub use crate::types::{FileIdentity, ParsedFileName, PerceptualHash, SceneRecord, Seconds};
