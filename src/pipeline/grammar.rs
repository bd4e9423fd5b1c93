//! Line rules: the declarative description of a lab-result line.
//!
//! A rule is a regex with five named groups: `test`, `result`, `unit`, `low`
//! and `high`. The extractor only sees the captured strings, so a new report
//! layout is a new rule and never touches classification.
//!
//! ## Built-in layouts
//!
//! * [`LineRule::tabular`]: `<name> <result> <unit> <low>-<high>` matched
//!   over the whole text in one pass. The name may contain whitespace,
//!   including line breaks, so a preceding line of plain words can be
//!   absorbed into the name.
//! * [`LineRule::single_line`]: the same fields, separated only by spaces or
//!   tabs, so a match never crosses a line break.

use crate::error::LabSheetError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Capture groups every rule must define.
pub const REQUIRED_GROUPS: [&str; 5] = ["test", "result", "unit", "low", "high"];

static RE_TABULAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<test>[A-Za-z0-9\-()/%\s]+?)\s+(?P<result>[<>]?[\d.]+)\s+(?P<unit>\S+)\s+(?P<low>[\d.]+)\s*[-–]\s*(?P<high>[\d.]+)",
    )
    .unwrap()
});

static RE_SINGLE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<test>[A-Za-z0-9\-()/%][A-Za-z0-9\-()/% \t]*?)[ \t]+(?P<result>[<>]?[\d.]+)[ \t]+(?P<unit>\S+)[ \t]+(?P<low>[\d.]+)[ \t]*[-–][ \t]*(?P<high>[\d.]+)",
    )
    .unwrap()
});

/// Which rule to scan reports with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportLayout {
    /// Whole-text scan; names may span lines. (default)
    #[default]
    Tabular,
    /// One result per line; names never span lines.
    SingleLine,
    /// A user-supplied regex with the five required named groups.
    Custom(String),
}

impl ReportLayout {
    /// Compile the layout into a [`LineRule`].
    pub fn to_rule(&self) -> Result<LineRule, LabSheetError> {
        match self {
            ReportLayout::Tabular => Ok(LineRule::tabular()),
            ReportLayout::SingleLine => Ok(LineRule::single_line()),
            ReportLayout::Custom(pattern) => LineRule::new("custom", pattern),
        }
    }
}

/// A named regex describing one lab-result line.
#[derive(Debug, Clone)]
pub struct LineRule {
    name: String,
    regex: Regex,
}

/// Raw captures of one rule match, before any numeric parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'t> {
    /// Test name with surrounding whitespace trimmed.
    pub test_name: &'t str,
    /// Result as printed, including any `<`/`>` marker.
    pub result: &'t str,
    pub unit: &'t str,
    pub low: &'t str,
    pub high: &'t str,
    /// Byte offset of the match in the scanned text.
    pub offset: usize,
}

impl LineRule {
    /// Compile a custom rule, checking that every required group exists.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, LabSheetError> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|e| LabSheetError::InvalidRule {
            name: name.clone(),
            reason: e.to_string(),
        })?;

        let missing: Vec<&str> = REQUIRED_GROUPS
            .iter()
            .copied()
            .filter(|group| !regex.capture_names().flatten().any(|n| n == *group))
            .collect();
        if !missing.is_empty() {
            return Err(LabSheetError::InvalidRule {
                name,
                reason: format!("missing named group(s): {}", missing.join(", ")),
            });
        }

        Ok(Self { name, regex })
    }

    pub fn tabular() -> Self {
        Self {
            name: "tabular".into(),
            regex: RE_TABULAR.clone(),
        }
    }

    pub fn single_line() -> Self {
        Self {
            name: "single-line".into(),
            regex: RE_SINGLE_LINE.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// All non-overlapping matches in `text`, left to right.
    pub fn candidates<'r, 't>(&'r self, text: &'t str) -> impl Iterator<Item = Candidate<'t>> + 'r
    where
        't: 'r,
    {
        self.regex.captures_iter(text).filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Candidate {
                test_name: caps.name("test")?.as_str().trim(),
                result: caps.name("result")?.as_str(),
                unit: caps.name("unit")?.as_str(),
                low: caps.name("low")?.as_str(),
                high: caps.name("high")?.as_str(),
                offset: whole.start(),
            })
        })
    }
}

impl Default for LineRule {
    fn default() -> Self {
        Self::tabular()
    }
}
