//! Lookup-source response parsing
//!
//! Turns one raw response body into normalized [`SceneRecord`]s. A body may
//! hold a search result (`{"data": [...]}`), a single lookup
//! (`{"data": {...}}`) or a bare array. Candidates that cannot be normalized
//! are reported back as [`MalformedRecord`]s; they never abort the rest of
//! the body.

use crate::types::{
    HashKind, ParsedFileName, PerformerRef, SceneHash, SceneRecord, SceneType, Seconds,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Record-level and body-level parse errors
#[derive(Debug, Error)]
pub enum RecordError {
    /// Body is not JSON or has an unexpected shape
    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    /// Candidate does not match the scene schema
    #[error("Invalid scene entry: {0}")]
    InvalidEntry(String),

    /// Candidate has no `id` / `_id`
    #[error("Scene entry has no identifier")]
    MissingId,

    /// Candidate has no title
    #[error("Scene {0} has no title")]
    MissingTitle(String),
}

/// Candidate skipped during parsing
#[derive(Debug)]
pub struct MalformedRecord {
    /// Position of the candidate in the response
    pub index: usize,
    pub error: RecordError,
}

/// Result of parsing one response body
#[derive(Debug, Default)]
pub struct ParsedResponse {
    pub records: Vec<SceneRecord>,
    pub skipped: Vec<MalformedRecord>,
}

// ============================================================================
// Payload schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiScene {
    id: Option<Value>,
    #[serde(rename = "_id")]
    internal_id: Option<Value>,
    #[serde(rename = "type")]
    scene_type: Option<String>,
    title: Option<String>,
    date: Option<String>,
    duration: Option<Value>,
    posters: Option<ApiPosters>,
    poster: Option<String>,
    image: Option<String>,
    site: Option<ApiSite>,
    performers: Option<Vec<ApiPerformer>>,
    hashes: Option<Vec<ApiHash>>,
}

#[derive(Debug, Deserialize)]
struct ApiPosters {
    large: Option<String>,
    medium: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiNamed {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSite {
    name: Option<String>,
    network: Option<ApiNamed>,
    parent: Option<ApiNamed>,
}

#[derive(Debug, Deserialize)]
struct ApiPerformerExtra {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPerformer {
    name: Option<String>,
    parent: Option<ApiNamed>,
    extra: Option<ApiPerformerExtra>,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiHash {
    hash: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    duration: Option<Value>,
}

// ============================================================================
// Parser
// ============================================================================

/// Stateless parser for lookup-source responses
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRecordParser;

impl SourceRecordParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw response body
    ///
    /// `source_id` is recorded on every record and used to infer the scene
    /// type when the payload omits it. `name_parts` is the file name metadata
    /// the lookup was made with.
    ///
    /// # Returns
    /// * `Ok(ParsedResponse)` - records plus skipped candidates (blank body → empty)
    /// * `Err(RecordError::InvalidBody)` - body unusable as a whole
    pub fn parse(
        &self,
        source_id: &str,
        body: &str,
        name_parts: &ParsedFileName,
    ) -> Result<ParsedResponse, RecordError> {
        if body.trim().is_empty() {
            return Ok(ParsedResponse::default());
        }

        let json: Value =
            serde_json::from_str(body).map_err(|e| RecordError::InvalidBody(e.to_string()))?;

        let entries = match json {
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Array(items)) => items,
                Some(item @ Value::Object(_)) => vec![item],
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(RecordError::InvalidBody(format!(
                        "unexpected `data` type: {}",
                        json_type(&other)
                    )))
                }
            },
            Value::Array(items) => items,
            other => {
                return Err(RecordError::InvalidBody(format!(
                    "unexpected top-level type: {}",
                    json_type(&other)
                )))
            }
        };

        let mut parsed = ParsedResponse::default();
        for (index, entry) in entries.into_iter().enumerate() {
            match to_record(entry, source_id, name_parts) {
                Ok(record) => parsed.records.push(record),
                Err(error) => parsed.skipped.push(MalformedRecord { index, error }),
            }
        }

        tracing::debug!(
            source = %source_id,
            records = parsed.records.len(),
            skipped = parsed.skipped.len(),
            "Parsed lookup response"
        );

        Ok(parsed)
    }
}

fn to_record(
    entry: Value,
    source_id: &str,
    name_parts: &ParsedFileName,
) -> Result<SceneRecord, RecordError> {
    let scene: ApiScene =
        serde_json::from_value(entry).map_err(|e| RecordError::InvalidEntry(e.to_string()))?;

    let id = scene
        .id
        .as_ref()
        .and_then(identifier)
        .or_else(|| scene.internal_id.as_ref().and_then(identifier))
        .ok_or(RecordError::MissingId)?;

    let name = scene
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RecordError::MissingTitle(id.clone()))?;

    let scene_type = scene
        .scene_type
        .as_deref()
        .and_then(SceneType::from_label)
        .unwrap_or_else(|| SceneType::from_source_id(source_id));

    let poster_url = scene
        .posters
        .and_then(|p| p.large.or(p.medium))
        .or(scene.poster)
        .or(scene.image)
        .filter(|p| !p.is_empty());

    let (site, network) = match scene.site {
        Some(site) => {
            let network = site
                .network
                .and_then(|n| n.name)
                .or_else(|| site.parent.and_then(|p| p.name));
            (site.name, network)
        }
        None => (None, None),
    };

    let performers = scene
        .performers
        .unwrap_or_default()
        .into_iter()
        .filter_map(to_performer)
        .collect();

    let hashes = scene
        .hashes
        .unwrap_or_default()
        .into_iter()
        .filter_map(|h| {
            let value = h.hash.filter(|v| !v.trim().is_empty())?;
            Some(SceneHash {
                kind: h.kind.as_deref().map(HashKind::from_label).unwrap_or(HashKind::Other),
                value,
                duration: h.duration.as_ref().and_then(source_duration),
            })
        })
        .collect();

    Ok(SceneRecord {
        date: scene.date.as_deref().and_then(release_date),
        duration: scene.duration.as_ref().and_then(source_duration),
        id,
        scene_type,
        name,
        poster_url,
        site,
        network,
        performers,
        hashes,
        source: source_id.to_string(),
        original_parsed_filename: name_parts.clone(),
    })
}

/// `parent.name` is the canonical performer; the scene-level name is the
/// alias they were credited under
fn to_performer(performer: ApiPerformer) -> Option<PerformerRef> {
    let credited = performer.name.filter(|n| !n.trim().is_empty());
    let canonical = performer
        .parent
        .and_then(|p| p.name)
        .filter(|n| !n.trim().is_empty());
    let role = performer
        .extra
        .and_then(|e| e.role)
        .or(performer.role)
        .filter(|r| !r.is_empty());

    match (canonical, credited) {
        (Some(name), Some(alias)) if !alias.eq_ignore_ascii_case(&name) => Some(PerformerRef {
            name,
            alias: Some(alias),
            role,
        }),
        (Some(name), _) | (None, Some(name)) => Some(PerformerRef {
            name,
            alias: None,
            role,
        }),
        (None, None) => None,
    }
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Source durations are published as whole seconds and passed through as-is.
/// Integral floats (`1800.0`) are accepted; anything else is absent.
fn source_duration(value: &Value) -> Option<Seconds> {
    let duration = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Null => return None,
        _ => None,
    };

    if duration.is_none() {
        tracing::debug!(value = %value, "Ignoring non-integral source duration");
    }
    duration.map(Seconds::new)
}

/// `YYYY-MM-DD`, optionally followed by a time component
fn release_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "https://api.theporndb.net/scenes?parse=site.24.01.05.test";

    fn parse(body: &str) -> ParsedResponse {
        SourceRecordParser::new()
            .parse(SOURCE, body, &ParsedFileName::default())
            .unwrap()
    }

    #[test]
    fn test_search_response_keeps_order() {
        let parsed = parse(
            r#"{"data": [
                {"id": "a", "title": "First", "duration": 1800},
                {"id": "b", "title": "Second"}
            ]}"#,
        );

        let ids: Vec<_> = parsed.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(parsed.records[0].duration, Some(Seconds::new(1800)));
        assert_eq!(parsed.records[1].duration, None);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_single_lookup_response() {
        let parsed = parse(
            r#"{"data": {
                "_id": 12345,
                "type": "Movie",
                "title": "  Feature  ",
                "date": "2024-01-05T00:00:00+00:00",
                "posters": {"large": "http://example.com/large.jpg"},
                "site": {"name": "TestSite", "parent": {"name": "TestNetwork"}}
            }}"#,
        );

        assert_eq!(parsed.records.len(), 1);
        let record = &parsed.records[0];
        assert_eq!(record.id, "12345");
        assert_eq!(record.scene_type, SceneType::Movie);
        assert_eq!(record.name, "Feature");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(record.poster_url.as_deref(), Some("http://example.com/large.jpg"));
        assert_eq!(record.site.as_deref(), Some("TestSite"));
        assert_eq!(record.network.as_deref(), Some("TestNetwork"));
        assert_eq!(record.source, SOURCE);
    }

    #[test]
    fn test_empty_payloads_yield_no_records() {
        assert!(parse("").records.is_empty());
        assert!(parse("   \n").records.is_empty());
        assert!(parse(r#"{"data": []}"#).records.is_empty());
        assert!(parse(r#"{"data": null}"#).records.is_empty());
        assert!(parse(r#"{"meta": {}}"#).records.is_empty());
    }

    #[test]
    fn test_invalid_body_is_error() {
        let parser = SourceRecordParser::new();
        let name_parts = ParsedFileName::default();

        assert!(matches!(
            parser.parse(SOURCE, "{not json", &name_parts),
            Err(RecordError::InvalidBody(_))
        ));
        assert!(matches!(
            parser.parse(SOURCE, r#"{"data": "nope"}"#, &name_parts),
            Err(RecordError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let parsed = parse(
            r#"{"data": [
                {"title": "No id"},
                {"id": "ok", "title": "Good"},
                {"id": "blank", "title": "   "},
                {"id": "bad", "title": ["not", "a", "string"]},
                "not an object"
            ]}"#,
        );

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].id, "ok");

        let skipped: Vec<_> = parsed.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![0, 2, 3, 4]);
        assert!(matches!(parsed.skipped[0].error, RecordError::MissingId));
        assert!(matches!(parsed.skipped[1].error, RecordError::MissingTitle(_)));
    }

    #[test]
    fn test_duration_is_never_coerced() {
        let parsed = parse(
            r#"{"data": [
                {"id": "int", "title": "t", "duration": 1800},
                {"id": "float", "title": "t", "duration": 1800.0},
                {"id": "fraction", "title": "t", "duration": 1800.5},
                {"id": "negative", "title": "t", "duration": -5},
                {"id": "null", "title": "t", "duration": null},
                {"id": "string", "title": "t", "duration": "1799"}
            ]}"#,
        );

        let durations: Vec<_> = parsed.records.iter().map(|r| r.duration).collect();
        assert_eq!(
            durations,
            vec![
                Some(Seconds::new(1800)),
                Some(Seconds::new(1800)),
                None,
                None,
                None,
                Some(Seconds::new(1799)),
            ]
        );
    }

    #[test]
    fn test_performers_and_aliases() {
        let parsed = parse(
            r#"{"data": [{
                "id": "p",
                "title": "t",
                "performers": [
                    {"name": "Janey", "parent": {"name": "Jane Doe"}, "extra": {"role": "Lead"}},
                    {"name": "John Roe", "parent": {"name": "john roe"}},
                    {"name": "Solo"},
                    {"parent": null}
                ]
            }]}"#,
        );

        let performers = &parsed.records[0].performers;
        assert_eq!(performers.len(), 3);
        assert_eq!(performers[0].name, "Jane Doe");
        assert_eq!(performers[0].alias.as_deref(), Some("Janey"));
        assert_eq!(performers[0].role.as_deref(), Some("Lead"));
        assert_eq!(performers[1].name, "john roe");
        assert_eq!(performers[1].alias, None);
        assert_eq!(performers[2].name, "Solo");
    }

    #[test]
    fn test_type_falls_back_to_source() {
        let parser = SourceRecordParser::new();
        let parsed = parser
            .parse(
                "https://api.theporndb.net/jav?q=abc",
                r#"{"data": [{"id": "j", "title": "t"}]}"#,
                &ParsedFileName::default(),
            )
            .unwrap();

        assert_eq!(parsed.records[0].scene_type, SceneType::Jav);
    }

    #[test]
    fn test_hashes() {
        let parsed = parse(
            r#"{"data": [{
                "id": "h",
                "title": "t",
                "hashes": [
                    {"hash": "c3c3c3c3c3c3c3c3", "type": "PHASH", "duration": 1820},
                    {"hash": "0123abcd", "type": "OSHASH"},
                    {"hash": "", "type": "MD5"}
                ]
            }]}"#,
        );

        let record = &parsed.records[0];
        assert_eq!(record.hashes.len(), 2);
        let phashes: Vec<_> = record.phashes().collect();
        assert_eq!(phashes.len(), 1);
        assert_eq!(phashes[0].duration, Some(Seconds::new(1820)));
        assert_eq!(record.hashes[1].kind, HashKind::Oshash);
    }
}
