//! File name parsing
//!
//! Splits names like `Brazzers.24.01.05.TS.Jane.Doe.Scene.Title.mp4` into
//! site, release date, trans flag, scene name and extension. The pattern can
//! be replaced from config; it must define a `name` group and may define
//! `site`, `year`, `month`, `day`, `trans` and `ext`.

use crate::types::ParsedFileName;
use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Default pattern: `{site} {yy[yy]} {mm} {dd} [TS] {name}.{ext}`
pub const DEFAULT_NAME_PATTERN: &str = r"^(?P<site>.+?)[.\- ]+(?P<year>\d{4}|\d{2})[.\- ]+(?P<month>\d{2})[.\- ]+(?P<day>\d{2})[.\- ]+(?:(?P<trans>[Tt][Ss])[.\- ]+)?(?P<name>.+?)\.(?P<ext>[A-Za-z0-9]{2,4})$";

/// File name parser errors
#[derive(Debug, Error)]
pub enum FileNameError {
    /// Custom pattern does not compile
    #[error("Invalid name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Custom pattern has no `name` capture group
    #[error("Name pattern must define a `name` group")]
    MissingNameGroup,
}

/// Compiled file name parser
#[derive(Debug, Clone)]
pub struct FileNameParser {
    pattern: Regex,
}

impl FileNameParser {
    /// Parser using [`DEFAULT_NAME_PATTERN`]
    pub fn new() -> Result<Self, FileNameError> {
        static DEFAULT_PATTERN: OnceLock<Regex> = OnceLock::new();

        let pattern = match DEFAULT_PATTERN.get() {
            Some(pattern) => pattern,
            None => {
                let compiled = Regex::new(DEFAULT_NAME_PATTERN)?;
                DEFAULT_PATTERN.get_or_init(|| compiled)
            }
        };
        Ok(Self {
            pattern: pattern.clone(),
        })
    }

    /// Parser using a custom pattern
    pub fn with_pattern(pattern: &str) -> Result<Self, FileNameError> {
        let pattern = Regex::new(pattern)?;
        if !pattern.capture_names().flatten().any(|n| n == "name") {
            return Err(FileNameError::MissingNameGroup);
        }
        Ok(Self { pattern })
    }

    /// Parser from an optional configured pattern, falling back to the default
    pub fn from_config(pattern: Option<&str>) -> Result<Self, FileNameError> {
        match pattern {
            Some(p) => Self::with_pattern(p),
            None => Self::new(),
        }
    }

    /// Parse the final path component of `file_name`
    ///
    /// Names that do not match still produce a result: the stem becomes the
    /// scene name so scoring has something to compare against.
    pub fn parse(&self, file_name: &str) -> ParsedFileName {
        let base = Path::new(file_name)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        match self.pattern.captures(&base) {
            Some(caps) => {
                let parsed = from_captures(&caps);
                tracing::debug!(
                    file = %base,
                    site = ?parsed.site,
                    date = ?parsed.date,
                    name = %parsed.name,
                    "Parsed file name"
                );
                parsed
            }
            None => {
                tracing::debug!(file = %base, "File name did not match pattern, using stem");
                let path = Path::new(&base);
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                ParsedFileName {
                    name: clean_words(&stem),
                    extension: path
                        .extension()
                        .map(|e| e.to_string_lossy().into_owned()),
                    ..Default::default()
                }
            }
        }
    }
}

fn from_captures(caps: &Captures<'_>) -> ParsedFileName {
    let group = |name: &str| caps.name(name).map(|m| m.as_str());

    let date = match (group("year"), group("month"), group("day")) {
        (Some(year), Some(month), Some(day)) => parse_date(year, month, day),
        _ => None,
    };

    ParsedFileName {
        site: group("site").map(clean_words).filter(|s| !s.is_empty()),
        date,
        trans: group("trans").is_some(),
        name: group("name").map(clean_words).unwrap_or_default(),
        extension: group("ext").map(str::to_string),
    }
}

/// Two-digit years are taken as 20xx
fn parse_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let mut year: i32 = year.parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Separators to single spaces
fn clean_words(raw: &str) -> String {
    raw.split(|c: char| c == '.' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_name() {
        let parsed = FileNameParser::new().unwrap().parse("EvilAngel.22.01.03.Carmela.Clutch.Fabulous.Anal.3-Way.XXX.mp4");

        assert_eq!(parsed.site.as_deref(), Some("EvilAngel"));
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2022, 1, 3));
        assert!(!parsed.trans);
        assert_eq!(parsed.name, "Carmela Clutch Fabulous Anal 3-Way XXX");
        assert_eq!(parsed.extension.as_deref(), Some("mp4"));
    }

    #[test]
    fn test_parse_four_digit_year_and_trans_flag() {
        let parsed = FileNameParser::new().unwrap().parse("/tmp/failed/Some Site - 2024-01-05 - TS - Scene Title.mkv");

        assert_eq!(parsed.site.as_deref(), Some("Some Site"));
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert!(parsed.trans);
        assert_eq!(parsed.name, "Scene Title");
        assert_eq!(parsed.extension.as_deref(), Some("mkv"));
    }

    #[test]
    fn test_invalid_calendar_date_is_absent() {
        let parsed = FileNameParser::new().unwrap().parse("Site.24.13.45.Name.mp4");
        assert_eq!(parsed.date, None);
        assert_eq!(parsed.name, "Name");
    }

    #[test]
    fn test_unmatched_name_falls_back_to_stem() {
        let parsed = FileNameParser::new().unwrap().parse("test_video.mp4");

        assert_eq!(parsed.site, None);
        assert_eq!(parsed.date, None);
        assert_eq!(parsed.name, "test video");
        assert_eq!(parsed.extension.as_deref(), Some("mp4"));
    }

    #[test]
    fn test_two_letter_extension() {
        let parsed = FileNameParser::new()
            .unwrap()
            .parse("Brazzers.24.01.05.Jane.Doe.Scene.Title.ts");

        assert_eq!(parsed.site.as_deref(), Some("Brazzers"));
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(parsed.name, "Jane Doe Scene Title");
        assert_eq!(parsed.extension.as_deref(), Some("ts"));
    }

    #[test]
    fn test_default_parser_is_reusable() {
        let first = FileNameParser::from_config(None).unwrap();
        let second = FileNameParser::new().unwrap();

        assert_eq!(first.pattern.as_str(), DEFAULT_NAME_PATTERN);
        assert_eq!(first.parse("Site.24.01.05.Name.mp4"), second.parse("Site.24.01.05.Name.mp4"));
    }

    #[test]
    fn test_custom_pattern_requires_name_group() {
        assert!(matches!(
            FileNameParser::with_pattern(r"^(?P<site>\w+)$"),
            Err(FileNameError::MissingNameGroup)
        ));
        assert!(matches!(
            FileNameParser::with_pattern(r"(?P<name>"),
            Err(FileNameError::InvalidPattern(_))
        ));

        let parser = FileNameParser::with_pattern(r"^(?P<name>.+)\.(?P<ext>\w+)$").unwrap();
        let parsed = parser.parse("Just.A.Title.mp4");
        assert_eq!(parsed.name, "Just A Title");
        assert_eq!(parsed.site, None);
    }
}
