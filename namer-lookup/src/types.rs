//! Shared types for duration resolution and lookup reconciliation
//!
//! These are the data contracts between the resolver, the source parser, the
//! match scorer and the aggregator. All of them are created fresh for a single
//! aggregation call and carry no identity beyond it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Durations
// ============================================================================

/// Non-negative whole number of seconds
///
/// A missing duration is `Option::<Seconds>::None`, never `Seconds(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seconds(u64);

impl Seconds {
    pub const fn new(seconds: u64) -> Self {
        Self(seconds)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Truncate fractional seconds toward zero (1234.5 → 1234)
    ///
    /// Returns `None` for NaN, infinite or negative input.
    pub fn from_fractional(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Self(value.trunc() as u64))
    }

    /// `M:SS` / `H:MM:SS` rendering
    pub fn to_human(self) -> String {
        namer_common::human_time::format_duration(self.0)
    }
}

impl From<u64> for Seconds {
    fn from(seconds: u64) -> Self {
        Self(seconds)
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

// ============================================================================
// File identity
// ============================================================================

/// A media file captured for one resolution pass
///
/// Used as the key for both the duration cache and the probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    path: PathBuf,
    stem: String,
    extension: Option<String>,
}

impl FileIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .filter(|e| !e.is_empty());
        Self {
            path,
            stem,
            extension,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Cache key: the path with forward slashes
    pub fn cache_key(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

// ============================================================================
// Parsed file name
// ============================================================================

/// Metadata parsed out of a local file name, used to build lookup queries
/// and to score candidates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFileName {
    pub site: Option<String>,
    pub date: Option<NaiveDate>,
    pub trans: bool,
    pub name: String,
    pub extension: Option<String>,
}

// ============================================================================
// Scene records
// ============================================================================

/// Kind of lookup result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SceneType {
    Scene,
    Movie,
    Jav,
}

impl SceneType {
    /// Parse the payload's `type` field (`"Scene"`, `"Movie"`, `"JAV"`)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "scene" | "scenes" => Some(Self::Scene),
            "movie" | "movies" => Some(Self::Movie),
            "jav" => Some(Self::Jav),
            _ => None,
        }
    }

    /// Infer the type from the endpoint a response came from
    pub fn from_source_id(source_id: &str) -> Self {
        let lower = source_id.to_ascii_lowercase();
        if lower.contains("/movies") {
            Self::Movie
        } else if lower.contains("/jav") {
            Self::Jav
        } else {
            Self::Scene
        }
    }
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneType::Scene => write!(f, "SCENE"),
            SceneType::Movie => write!(f, "MOVIE"),
            SceneType::Jav => write!(f, "JAV"),
        }
    }
}

/// Performer credited on a scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformerRef {
    /// Canonical performer name
    pub name: String,
    /// Name the performer is credited under in this scene, if different
    pub alias: Option<String>,
    pub role: Option<String>,
}

/// Fingerprint algorithm of a source-provided hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HashKind {
    Phash,
    Oshash,
    Md5,
    Other,
}

impl HashKind {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "PHASH" => Self::Phash,
            "OSHASH" => Self::Oshash,
            "MD5" => Self::Md5,
            _ => Self::Other,
        }
    }
}

/// Fingerprint published by a lookup source for a scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneHash {
    pub kind: HashKind,
    pub value: String,
    pub duration: Option<Seconds>,
}

/// One normalized candidate from a lookup-source response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    /// Source-assigned identifier
    pub id: String,
    #[serde(rename = "type")]
    pub scene_type: SceneType,
    pub name: String,
    pub date: Option<NaiveDate>,
    /// TPDB-reported duration, whole seconds as published
    pub duration: Option<Seconds>,
    pub poster_url: Option<String>,
    pub site: Option<String>,
    pub network: Option<String>,
    pub performers: Vec<PerformerRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<SceneHash>,
    /// Source id of the response this record came from
    pub source: String,
    /// File name metadata the lookup query was generated from
    pub original_parsed_filename: ParsedFileName,
}

impl SceneRecord {
    /// Perceptual hashes with their published durations
    pub fn phashes(&self) -> impl Iterator<Item = &SceneHash> {
        self.hashes.iter().filter(|h| h.kind == HashKind::Phash)
    }
}

// ============================================================================
// Local fingerprint
// ============================================================================

/// Perceptual hash computed from the local file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerceptualHash {
    pub hash: u64,
    pub duration: Option<Seconds>,
}

impl PerceptualHash {
    pub fn new(hash: u64, duration: Option<Seconds>) -> Self {
        Self { hash, duration }
    }

    /// Parse a 64-bit hex hash (with or without `0x`)
    pub fn parse_hex(value: &str) -> Option<u64> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > 16 {
            return None;
        }
        u64::from_str_radix(digits, 16).ok()
    }

    /// Hamming distance to another 64-bit hash
    pub fn distance(&self, other: u64) -> u32 {
        (self.hash ^ other).count_ones()
    }
}
