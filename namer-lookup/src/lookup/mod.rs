//! Lookup reconciliation: source parsing, match scoring and aggregation

pub mod aggregator;
pub mod parser;
pub mod scorer;

pub use aggregator::{ResponseAggregator, ResultEntry, SourceResponse};
pub use parser::{MalformedRecord, ParsedResponse, RecordError, SourceRecordParser};
pub use scorer::{MatchResult, MatchScorer};
