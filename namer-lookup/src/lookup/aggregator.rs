//! Response aggregation
//!
//! Merges every candidate from every lookup-source response into one ordered
//! list of [`ResultEntry`] for a single target file:
//!
//! 1. Parse the target file name
//! 2. Parse each response in input order, keeping candidate order
//! 3. Resolve the file duration once
//! 4. Score each candidate and attach the shared file duration
//!
//! Output order is response order, then candidate order. Nothing is re-sorted
//! by score here; ranking is left to the presentation layer.

use crate::duration::DurationResolver;
use crate::filename::{FileNameError, FileNameParser};
use crate::lookup::parser::SourceRecordParser;
use crate::lookup::scorer::{MatchResult, MatchScorer};
use crate::types::{PerceptualHash, SceneRecord, Seconds};
use namer_common::TomlConfig;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Raw body returned by one lookup source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResponse {
    /// Source identifier, typically the request URL
    pub source_id: String,
    pub body: String,
}

impl SourceResponse {
    pub fn new(source_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            body: body.into(),
        }
    }
}

impl<S: Into<String>, B: Into<String>> From<(S, B)> for SourceResponse {
    fn from((source_id, body): (S, B)) -> Self {
        Self::new(source_id, body)
    }
}

/// One candidate as presented to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub looked_up: SceneRecord,
    #[serde(rename = "match")]
    pub match_result: MatchResult,
    /// Duration of the local file, shared by every entry of one call
    pub file_duration: Option<Seconds>,
}

/// Builds ordered result entries for a target file from raw source responses
pub struct ResponseAggregator {
    parser: SourceRecordParser,
    scorer: MatchScorer,
    name_parser: FileNameParser,
    resolver: DurationResolver,
    /// Lowercase, without leading dot; the first one is appended to bare names
    target_extensions: Vec<String>,
}

impl ResponseAggregator {
    pub fn new(
        resolver: DurationResolver,
        scorer: MatchScorer,
        name_parser: FileNameParser,
        target_extensions: Vec<String>,
    ) -> Self {
        Self {
            parser: SourceRecordParser::new(),
            scorer,
            name_parser,
            resolver,
            target_extensions: target_extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    /// Aggregator wired from configuration
    ///
    /// # Errors
    /// Returns error if the configured `name_parser` pattern is invalid
    pub fn from_config(
        config: &TomlConfig,
        resolver: DurationResolver,
    ) -> Result<Self, FileNameError> {
        Ok(Self::new(
            resolver,
            MatchScorer::from_config(config),
            FileNameParser::from_config(config.name_parser.as_deref())?,
            config.extensions(),
        ))
    }

    pub fn resolver(&self) -> &DurationResolver {
        &self.resolver
    }

    /// Aggregate without a local perceptual hash
    pub async fn aggregate(&self, responses: &[SourceResponse], target_file: &str) -> Vec<ResultEntry> {
        self.aggregate_with_fingerprint(responses, target_file, None)
            .await
    }

    /// Aggregate, also scoring perceptual-hash distance against `fingerprint`
    ///
    /// Never fails: unusable responses and candidates are logged and skipped,
    /// and an unresolvable duration is `None` on every entry.
    pub async fn aggregate_with_fingerprint(
        &self,
        responses: &[SourceResponse],
        target_file: &str,
        fingerprint: Option<&PerceptualHash>,
    ) -> Vec<ResultEntry> {
        if responses.is_empty() || target_file.trim().is_empty() {
            debug!(
                responses = responses.len(),
                target = %target_file,
                "Nothing to aggregate"
            );
            return Vec::new();
        }

        let name_parts = self.name_parser.parse(&self.lookup_name(target_file));

        let mut candidates = Vec::new();
        for response in responses {
            match self
                .parser
                .parse(&response.source_id, &response.body, &name_parts)
            {
                Ok(parsed) => {
                    for skipped in &parsed.skipped {
                        warn!(
                            source = %response.source_id,
                            index = skipped.index,
                            "Skipping malformed candidate: {}",
                            skipped.error
                        );
                    }
                    candidates.extend(parsed.records);
                }
                Err(e) => {
                    warn!(source = %response.source_id, "Discarding response: {}", e);
                }
            }
        }

        if candidates.is_empty() {
            debug!(target = %target_file, "No candidates in any response");
            return Vec::new();
        }

        // Resolved once; every entry gets the same value
        let file_duration = self.resolver.resolve(target_file).await;

        let entries: Vec<ResultEntry> = candidates
            .into_iter()
            .map(|candidate| {
                let match_result =
                    self.scorer
                        .score(&candidate, &candidate.original_parsed_filename, fingerprint);
                ResultEntry {
                    looked_up: candidate,
                    match_result,
                    file_duration,
                }
            })
            .collect();

        info!(
            target = %target_file,
            responses = responses.len(),
            candidates = entries.len(),
            matches = entries.iter().filter(|e| e.match_result.is_match()).count(),
            file_duration = ?file_duration.map(Seconds::get),
            "Aggregated lookup responses"
        );

        entries
    }

    /// File name used for parsing: the target's file name, with the first
    /// target extension appended unless it already ends in one
    ///
    /// Dotted names (`Site.24.01.05.Name`) have a `Path` extension that is
    /// really part of the title, so only known target extensions count.
    fn lookup_name(&self, target_file: &str) -> String {
        let path = Path::new(target_file);
        let base = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| target_file.to_string());

        let has_target_extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.target_extensions.contains(&ext));

        match self.target_extensions.first() {
            Some(ext) if !has_target_extension => format!("{}.{}", base, ext),
            _ => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator(target_extensions: &[&str]) -> ResponseAggregator {
        ResponseAggregator::new(
            DurationResolver::new("/nonexistent/failed"),
            MatchScorer::default(),
            FileNameParser::new().unwrap(),
            target_extensions.iter().map(|e| e.to_string()).collect(),
        )
    }

    #[test]
    fn test_lookup_name_appends_default_extension() {
        let agg = aggregator(&["mp4", ".MKV"]);
        assert_eq!(agg.lookup_name("sub/Site.24.01.05.Name"), "Site.24.01.05.Name.mp4");
        assert_eq!(agg.lookup_name("Site.24.01.05.Name.mkv"), "Site.24.01.05.Name.mkv");
        assert_eq!(agg.lookup_name("Site.24.01.05.Name.MP4"), "Site.24.01.05.Name.MP4");

        let no_default = aggregator(&[]);
        assert_eq!(no_default.lookup_name("bare"), "bare");
    }

    #[test]
    fn test_source_response_from_tuple() {
        let response: SourceResponse = ("http://api.example.com", "{}").into();
        assert_eq!(response.source_id, "http://api.example.com");
        assert_eq!(response.body, "{}");
    }

    #[tokio::test]
    async fn test_blank_target_yields_nothing() {
        let agg = aggregator(&[]);
        let responses = vec![SourceResponse::new("s", r#"{"data": [{"id": "a", "title": "t"}]}"#)];

        assert!(agg.aggregate(&responses, "   ").await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_gives_absent_duration() {
        let agg = aggregator(&[]);
        let responses = vec![SourceResponse::new("s", r#"{"data": [{"id": "a", "title": "t", "duration": 60}]}"#)];

        let entries = agg.aggregate(&responses, "missing.mp4").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].looked_up.duration, Some(Seconds::new(60)));
        assert_eq!(entries[0].file_duration, None);
    }
}
