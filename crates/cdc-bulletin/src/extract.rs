//! Statistics extraction from whitespace-collapsed bulletin paragraphs.
//!
//! A paragraph qualifies when it contains [`ANCHOR`]. The text before the
//! anchor carries the reported count and its date, the text after it carries
//! the positivity percentage and its date. Each half is split into clauses
//! on full-width punctuation and the clauses are searched in a configurable
//! order; the first clause matching the expected date/value shape wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{BulletinReference, ExtractionResult};

/// Marks a paragraph as carrying the statistics.
pub const ANCHOR: &str = "检测阳性率";

/// Full-width comma, semicolon and full stop.
pub const CLAUSE_DELIMITERS: [char; 3] = ['，', '；', '。'];

const TEN_THOUSAND: char = '万';

static RE_DATE_AND_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:[0-9]{4}年)?[0-9]+月[0-9]+日).{1,6}?((?:[0-9]+\.)?[0-9]+万?)")
        .expect("invalid regex: date and count")
});

static RE_DATE_AND_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:[0-9]{4}年)?[0-9]+月[0-9]+日).{1,4}?((?:[0-9]+\.)?[0-9]+%)")
        .expect("invalid regex: date and percent")
});

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("No date and count found before the anchor in: {0}")]
    CountNotFound(String),
    #[error("No date and positive percent found after the anchor in: {0}")]
    PercentNotFound(String),
    #[error("Invalid count: {0}")]
    InvalidCount(String),
}

/// Order in which the clauses of one half are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOrder {
    /// Last clause first.
    #[default]
    Backward,
    /// First clause first.
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractorConfig {
    pub before_order: ScanOrder,
    pub after_order: ScanOrder,
    /// Only consider this many clauses on each side, nearest to the anchor.
    pub window: Option<usize>,
}

/// Matched date text plus value text from one clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentMatch<'a> {
    pub date: &'a str,
    pub value: &'a str,
}

/// Result of scanning every paragraph of one bulletin.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Found(ExtractionResult),
    Miss { date: String, link: String },
}

/// Converts a count token such as `35000`, `3.5` or `3.5万` to a number.
pub fn normalize_count(token: &str) -> Result<f64, ExtractError> {
    let invalid = || ExtractError::InvalidCount(token.to_string());

    let (digits, multiplier) = match token.strip_suffix(TEN_THOUSAND) {
        Some(prefix) => (prefix, 10_000.0),
        None => (token, 1.0),
    };

    // f64::from_str also accepts "inf", "NaN" and exponents
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid());
    }

    let value = digits.parse::<f64>().map_err(|_| invalid())? * multiplier;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(invalid())
    }
}

/// Returns the date and value groups of the first segment matching `pattern`.
pub fn first_match<'a, I>(segments: I, pattern: &Regex) -> Option<SegmentMatch<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    segments.into_iter().find_map(|segment| {
        let caps = pattern.captures(segment)?;
        Some(SegmentMatch {
            date: caps.get(1)?.as_str(),
            value: caps.get(2)?.as_str(),
        })
    })
}

/// Splits `text` into clauses, keeps the `window` clauses nearest the
/// anchor and returns them in scan order.
fn ordered_segments(
    text: &str,
    anchor_side: AnchorSide,
    order: ScanOrder,
    window: Option<usize>,
) -> Vec<&str> {
    let mut segments: Vec<&str> = text
        .split(CLAUSE_DELIMITERS)
        .filter(|s| !s.is_empty())
        .collect();

    if let Some(window) = window {
        match anchor_side {
            AnchorSide::End => {
                let skip = segments.len().saturating_sub(window);
                segments.drain(..skip);
            }
            AnchorSide::Start => segments.truncate(window),
        }
    }

    if order == ScanOrder::Backward {
        segments.reverse();
    }
    segments
}

#[derive(Debug, Clone, Copy)]
enum AnchorSide {
    Start,
    End,
}

/// Extracts statistics from one whitespace-collapsed paragraph.
///
/// `Ok(None)` means the paragraph does not mention [`ANCHOR`]. Once the
/// anchor is present, a missing clause or an unparsable count is an error.
pub fn extract_statistics(
    paragraph: &str,
    config: &ExtractorConfig,
) -> Result<Option<ExtractionResult>, ExtractError> {
    let Some(anchor_pos) = paragraph.find(ANCHOR) else {
        return Ok(None);
    };

    let before_text = &paragraph[..anchor_pos];
    let after_text = &paragraph[anchor_pos + ANCHOR.len()..];

    let before = ordered_segments(
        before_text,
        AnchorSide::End,
        config.before_order,
        config.window,
    );
    let count_match = first_match(before, &RE_DATE_AND_COUNT)
        .ok_or_else(|| ExtractError::CountNotFound(paragraph.to_string()))?;
    let count = normalize_count(count_match.value)?;

    let after = ordered_segments(
        after_text,
        AnchorSide::Start,
        config.after_order,
        config.window,
    );
    let percent_match = first_match(after, &RE_DATE_AND_PERCENT)
        .ok_or_else(|| ExtractError::PercentNotFound(paragraph.to_string()))?;

    Ok(Some(ExtractionResult {
        count,
        count_date: count_match.date.to_string(),
        positive_percent: percent_match.value.to_string(),
        positive_percent_date: percent_match.date.to_string(),
    }))
}

/// Runs [`extract_statistics`] over paragraphs in order, stopping at the
/// first one that yields a result.
pub fn first_statistics<S: AsRef<str>>(
    paragraphs: &[S],
    config: &ExtractorConfig,
) -> Result<Option<ExtractionResult>, ExtractError> {
    for paragraph in paragraphs {
        if let Some(result) = extract_statistics(paragraph.as_ref(), config)? {
            return Ok(Some(result));
        }
    }
    Ok(None)
}

/// Scans one bulletin's paragraphs; a miss carries the bulletin's date and
/// link for reporting.
pub fn scan_bulletin<S: AsRef<str>>(
    post: &BulletinReference,
    paragraphs: &[S],
    config: &ExtractorConfig,
) -> Result<ScanOutcome, ExtractError> {
    Ok(match first_statistics(paragraphs, config)? {
        Some(result) => ScanOutcome::Found(result),
        None => ScanOutcome::Miss {
            date: post.date.clone(),
            link: post.link.clone(),
        },
    })
}

/// Removes every whitespace run, not just the surrounding ones.
pub fn collapse_whitespace(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{feff}')
        .collect()
}
