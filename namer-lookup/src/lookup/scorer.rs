//! Candidate match scoring
//!
//! Compares one [`SceneRecord`] against the local file's parsed name and,
//! when available, its perceptual hash. Every metric is `None` when one side
//! lacks the input it needs; an unmeasured metric is never reported as zero.

use crate::types::{ParsedFileName, PerceptualHash, SceneRecord};
use serde::Serialize;
use std::collections::BTreeSet;

/// Relative tolerance when comparing fingerprint durations
const PHASH_DURATION_TOLERANCE: f64 = 0.05;

/// Scores of one candidate against the local file
///
/// Fields are fixed at scoring time; callers only get read access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    name_match: Option<f64>,
    matched_name: Option<String>,
    site_match: Option<bool>,
    date_match: Option<bool>,
    phash_distance: Option<u32>,
    phash_duration: Option<bool>,
    is_match: bool,
}

impl MatchResult {
    /// Best token-set similarity (0-100) between the file name and any
    /// candidate name variant
    pub fn name_match(&self) -> Option<f64> {
        self.name_match
    }

    /// Candidate name variant that produced [`name_match`](Self::name_match)
    pub fn matched_name(&self) -> Option<&str> {
        self.matched_name.as_deref()
    }

    pub fn site_match(&self) -> Option<bool> {
        self.site_match
    }

    pub fn date_match(&self) -> Option<bool> {
        self.date_match
    }

    /// Hamming distance to the closest source perceptual hash
    pub fn phash_distance(&self) -> Option<u32> {
        self.phash_distance
    }

    /// Whether the closest hash's duration agrees with the local one
    pub fn phash_duration(&self) -> Option<bool> {
        self.phash_duration
    }

    /// Confident match under the scorer's thresholds
    pub fn is_match(&self) -> bool {
        self.is_match
    }
}

/// Scores candidates against a local file
#[derive(Debug, Clone)]
pub struct MatchScorer {
    name_match_threshold: f64,
    phash_distance_threshold: u32,
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::new(89.9, 2)
    }
}

impl MatchScorer {
    pub fn new(name_match_threshold: f64, phash_distance_threshold: u32) -> Self {
        Self {
            name_match_threshold,
            phash_distance_threshold,
        }
    }

    pub fn from_config(config: &namer_common::TomlConfig) -> Self {
        Self::new(config.name_match_threshold, config.phash_distance_threshold)
    }

    /// Score `candidate` against the parsed local file name and optional fingerprint
    pub fn score(
        &self,
        candidate: &SceneRecord,
        file: &ParsedFileName,
        fingerprint: Option<&PerceptualHash>,
    ) -> MatchResult {
        let (name_match, matched_name) = match best_name_match(candidate, &file.name) {
            Some((score, name)) => (Some(score), Some(name)),
            None => (None, None),
        };

        let site_match = site_matches(file.site.as_deref(), candidate);
        let date_match = match (file.date, candidate.date) {
            (Some(local), Some(remote)) => Some(local == remote),
            _ => None,
        };

        let (phash_distance, phash_duration) = match fingerprint {
            Some(fingerprint) => closest_phash(fingerprint, candidate),
            None => (None, None),
        };

        let metadata_match = site_match == Some(true)
            && date_match == Some(true)
            && name_match.is_some_and(|n| n >= self.name_match_threshold);
        let phash_match = phash_distance.is_some_and(|d| d <= self.phash_distance_threshold)
            && phash_duration == Some(true);

        MatchResult {
            name_match,
            matched_name,
            site_match,
            date_match,
            phash_distance,
            phash_duration,
            is_match: metadata_match || phash_match,
        }
    }
}

/// Name variants a file may have been named after: the title alone, each
/// performer (and credited alias) in front of it, and all performers together
fn name_variants(candidate: &SceneRecord) -> Vec<String> {
    let mut variants = vec![candidate.name.clone()];

    for performer in &candidate.performers {
        variants.push(format!("{} {}", performer.name, candidate.name));
        if let Some(alias) = &performer.alias {
            variants.push(format!("{} {}", alias, candidate.name));
        }
    }

    if candidate.performers.len() > 1 {
        let everyone = candidate
            .performers
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        variants.push(format!("{} {}", everyone, candidate.name));
    }

    let mut seen = BTreeSet::new();
    variants.retain(|v| seen.insert(v.to_lowercase()));
    variants
}

/// Highest scoring variant; the first one wins ties
fn best_name_match(candidate: &SceneRecord, file_name: &str) -> Option<(f64, String)> {
    if tokens(file_name).is_empty() {
        return None;
    }

    let mut best: Option<(f64, String)> = None;
    for variant in name_variants(candidate) {
        let score = token_set_ratio(file_name, &variant);
        if best.as_ref().map_or(true, |(b, _)| score > *b) {
            best = Some((score, variant));
        }
    }
    best
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Token-set similarity in percent, rounded to two decimals
///
/// Word order and duplicated words do not matter; a name whose words are all
/// contained in the other scores 100.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = (tokens(a), tokens(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let join = |set: BTreeSet<&String>| {
        set.into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let common = join(a.intersection(&b).collect());
    let only_a = join(a.difference(&b).collect());
    let only_b = join(b.difference(&a).collect());

    if !common.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let combined = |rest: &str| {
        if common.is_empty() {
            rest.to_string()
        } else {
            format!("{} {}", common, rest)
        }
    };
    let with_a = combined(&only_a);
    let with_b = combined(&only_b);

    let mut ratio = strsim::normalized_levenshtein(&with_a, &with_b);
    if !common.is_empty() {
        ratio = ratio
            .max(strsim::normalized_levenshtein(&common, &with_a))
            .max(strsim::normalized_levenshtein(&common, &with_b));
    }

    (ratio * 10_000.0).round() / 100.0
}

fn normalize_site(site: &str) -> String {
    site.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn site_matches(file_site: Option<&str>, candidate: &SceneRecord) -> Option<bool> {
    let local = normalize_site(file_site?);
    if local.is_empty() {
        return None;
    }

    let remote: Vec<String> = [candidate.site.as_deref(), candidate.network.as_deref()]
        .into_iter()
        .flatten()
        .map(normalize_site)
        .filter(|s| !s.is_empty())
        .collect();
    if remote.is_empty() {
        return None;
    }

    Some(remote.iter().any(|r| *r == local))
}

/// Distance to the closest parseable source phash, and whether that hash's
/// duration agrees with the local one
fn closest_phash(
    fingerprint: &PerceptualHash,
    candidate: &SceneRecord,
) -> (Option<u32>, Option<bool>) {
    let closest = candidate
        .phashes()
        .filter_map(|h| PerceptualHash::parse_hex(&h.value).map(|v| (fingerprint.distance(v), h)))
        .min_by_key(|(distance, _)| *distance);

    match closest {
        Some((distance, hash)) => {
            let duration_agrees = match (fingerprint.duration, hash.duration) {
                (Some(local), Some(remote)) => {
                    let local = local.get() as f64;
                    let tolerance = (local * PHASH_DURATION_TOLERANCE).max(1.0);
                    Some((local - remote.get() as f64).abs() <= tolerance)
                }
                _ => None,
            };
            (Some(distance), duration_agrees)
        }
        None => (None, None),
    }
}
