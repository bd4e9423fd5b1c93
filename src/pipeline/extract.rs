//! Record extraction: turn normalised report text into [`LabResultRecord`]s.
//!
//! Extraction is a pure function of the text, the line rule and the
//! reference store. Every rule match is a *candidate*; a candidate becomes a
//! record only when its result and both range bounds parse as numbers.
//! Candidates that fail are kept as [`CandidateError`]s rather than dropped
//! without a trace, so `records + rejected == candidates` always holds.

use crate::error::{CandidateError, NumericField};
use crate::pipeline::grammar::{Candidate, LineRule};
use crate::record::LabResultRecord;
use crate::reference::ReferenceStore;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use tracing::{debug, warn};

static DEFAULT_EXTRACTOR: Lazy<Extractor> = Lazy::new(Extractor::default);

static RE_DECIMAL_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d$").unwrap());

/// Extract records from `text` with the default tabular rule.
///
/// Output order is the order of occurrence in `text`. Lines whose numbers
/// do not parse are skipped; use [`Extractor::extract`] to see them.
pub fn extract(text: &str, store: &dyn ReferenceStore) -> Vec<LabResultRecord> {
    DEFAULT_EXTRACTOR.extract(text, store).records
}

/// Result of scanning one text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    /// Parsed records in source order.
    pub records: Vec<LabResultRecord>,
    /// Candidates that matched the rule but had an unparsable number.
    pub rejected: Vec<CandidateError>,
    /// Raw rule matches (`records.len() + rejected.len()`).
    pub candidates: usize,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Applies a [`LineRule`] and classifies each match.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    rule: LineRule,
}

impl Extractor {
    pub fn new(rule: LineRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &LineRule {
        &self.rule
    }

    /// Scan `text` and build one record per well-formed candidate.
    pub fn extract(&self, text: &str, store: &dyn ReferenceStore) -> Extraction {
        let mut extraction = Extraction::default();

        for candidate in self.rule.candidates(text) {
            extraction.candidates += 1;
            match parse_candidate(&candidate, store) {
                Ok(record) => extraction.records.push(record),
                Err(e) => {
                    warn!("Skipping candidate line: {}", e);
                    extraction.rejected.push(e);
                }
            }
        }

        debug!(
            "Rule '{}' matched {} candidates: {} records, {} rejected",
            self.rule.name(),
            extraction.candidates,
            extraction.records.len(),
            extraction.rejected.len()
        );

        extraction
    }
}

/// Parse the numeric fields of one candidate and look up its prior value.
fn parse_candidate(
    candidate: &Candidate<'_>,
    store: &dyn ReferenceStore,
) -> Result<LabResultRecord, CandidateError> {
    let result = strip_censoring_marker(candidate.result);
    let current = parse_number(candidate, NumericField::Result, result)?;
    let low = parse_number(candidate, NumericField::ReferenceLow, candidate.low)?;
    let high = parse_number(candidate, NumericField::ReferenceHigh, candidate.high)?;

    let prior = store.lookup(candidate.test_name);
    Ok(LabResultRecord::new(
        candidate.test_name,
        candidate.unit,
        current,
        low,
        high,
        prior,
    ))
}

/// Drop a leading `<` or `>` (below/above detection limit).
fn strip_censoring_marker(raw: &str) -> &str {
    raw.trim_start_matches(['<', '>']).trim()
}

/// Parse a captured number. Digits from any script are accepted, since the
/// line rules match Unicode `\d`. Overlong digit runs become infinite.
fn parse_number(
    candidate: &Candidate<'_>,
    field: NumericField,
    raw: &str,
) -> Result<f64, CandidateError> {
    to_ascii_digits(raw)
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .ok_or_else(|| CandidateError::InvalidNumber {
            test_name: candidate.test_name.to_string(),
            field,
            raw: raw.to_string(),
            offset: candidate.offset,
        })
}

fn to_ascii_digits(raw: &str) -> Cow<'_, str> {
    if raw.is_ascii() {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(raw.chars().map(|c| ascii_digit(c).unwrap_or(c)).collect())
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    RE_DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buf))
}

/// ASCII form of a decimal digit in any script.
///
/// Decimal digits are assigned in contiguous runs of ten starting at zero,
/// so a digit's value is the length of the run before it, modulo ten.
fn ascii_digit(c: char) -> Option<char> {
    if c.is_ascii_digit() {
        return Some(c);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut run = 0u32;
    let mut cp = c as u32;
    while let Some(prev) = cp.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        run += 1;
        cp -= 1;
    }
    char::from_digit(run % 10, 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Status;
    use crate::reference::{InMemoryReferenceStore, PriorResult};

    fn hemoglobin_store() -> InMemoryReferenceStore {
        let mut store = InMemoryReferenceStore::new();
        store.insert("Hemoglobin", PriorResult::new(13.2, "2024-12-15"));
        store
    }

    #[test]
    fn hemoglobin_low_with_change() {
        let records = extract("Hemoglobin 11.0 g/dL 13.0-17.0", &hemoglobin_store());
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.test_name(), "Hemoglobin");
        assert_eq!(r.unit(), "g/dL");
        assert_eq!(r.current_value(), 11.0);
        assert_eq!(r.reference_range(), "13.0 - 17.0");
        assert_eq!(r.status(), Status::Low);
        assert_eq!(r.previous_value(), Some(13.2));
        assert_eq!(r.previous_date(), Some("2024-12-15"));
        assert_eq!(r.change(), Some(11.0 - 13.2));
        assert!((r.change().unwrap() + 2.2).abs() < 1e-9);
    }

    #[test]
    fn platelets_without_prior() {
        let records = extract(
            "Platelet Count 250000 /uL 150000-450000",
            &InMemoryReferenceStore::new(),
        );
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.status(), Status::Normal);
        assert_eq!(r.previous_value(), None);
        assert_eq!(r.change(), None);
    }

    #[test]
    fn non_numeric_result_yields_nothing() {
        let store = InMemoryReferenceStore::seeded();
        assert!(extract("Cholesterol abc mg/dL 100-200", &store).is_empty());
    }

    #[test]
    fn empty_text_yields_nothing() {
        let extraction = Extractor::default().extract("", &InMemoryReferenceStore::seeded());
        assert!(extraction.is_empty());
        assert_eq!(extraction.candidates, 0);
        assert!(extraction.rejected.is_empty());
    }

    #[test]
    fn malformed_number_is_rejected_not_fatal() {
        let text = "Glucose 1.2.3 mg/dL 70-110\nHemoglobin 14.0 g/dL 13.0-17.0";
        let extraction = Extractor::default().extract(text, &hemoglobin_store());

        assert_eq!(extraction.candidates, 2);
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].test_name(), "Hemoglobin");
        assert_eq!(
            extraction.rejected,
            vec![CandidateError::InvalidNumber {
                test_name: "Glucose".into(),
                field: NumericField::Result,
                raw: "1.2.3".into(),
                offset: 0,
            }]
        );
    }

    #[test]
    fn malformed_range_bound_is_rejected() {
        let extraction =
            Extractor::default().extract("Sodium 140 mmol/L 135-1.4.5", &InMemoryReferenceStore::new());
        assert!(extraction.records.is_empty());
        match &extraction.rejected[0] {
            CandidateError::InvalidNumber { field, raw, .. } => {
                assert_eq!(*field, NumericField::ReferenceHigh);
                assert_eq!(raw, "1.4.5");
            }
        }
    }

    #[test]
    fn censoring_markers_are_stripped() {
        let text = "CRP <0.5 mg/L 0-5\nFerritin >1000 ng/mL 30-400";
        let records = extract(text, &InMemoryReferenceStore::new());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].current_value(), 0.5);
        assert_eq!(records[0].status(), Status::Normal);
        assert_eq!(records[1].current_value(), 1000.0);
        assert_eq!(records[1].status(), Status::High);
    }

    #[test]
    fn order_follows_source_text() {
        let text = "\
Triglyceride 160 mg/dL 0-150
Hemoglobin 14.1 g/dL 13.0-17.0
Cholesterol 150 mg/dL 100-200
";
        let records = extract(text, &InMemoryReferenceStore::seeded());
        let names: Vec<_> = records.iter().map(|r| r.test_name()).collect();
        assert_eq!(names, vec!["Triglyceride", "Hemoglobin", "Cholesterol"]);
        assert_eq!(records[0].status(), Status::High);
        assert_eq!(records[0].change(), Some(160.0 - 145.0));
    }

    #[test]
    fn repeated_tests_each_produce_a_record() {
        let text = "Hemoglobin 11.0 g/dL 13.0-17.0\nHemoglobin 12.0 g/dL 13.0-17.0";
        let records = extract(text, &hemoglobin_store());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].current_value(), 12.0);
    }

    #[test]
    fn range_bounds_classify_as_normal() {
        let text = "Potassium 3.5 mmol/L 3.5-5.1\nSodium 145 mmol/L 135-145";
        let records = extract(text, &InMemoryReferenceStore::new());
        assert!(records.iter().all(|r| r.status() == Status::Normal));
    }

    #[test]
    fn single_line_rule_via_extractor() {
        let text = "COMPLETE BLOOD COUNT\nHemoglobin 11.0 g/dL 13.0-17.0";
        let tabular = Extractor::default().extract(text, &hemoglobin_store());
        assert_eq!(tabular.records[0].test_name(), "COMPLETE BLOOD COUNT\nHemoglobin");
        assert_eq!(tabular.records[0].previous_value(), None);

        let single = Extractor::new(LineRule::single_line()).extract(text, &hemoglobin_store());
        assert_eq!(single.records[0].test_name(), "Hemoglobin");
        assert_eq!(single.records[0].previous_value(), Some(13.2));
    }

    #[test]
    fn counts_are_consistent() {
        let text = "A 1 u 0-2\nB 1.1.1 u 0-2\nC 3 u 0-2\nD . u 0-2";
        let extraction = Extractor::default().extract(text, &InMemoryReferenceStore::new());
        assert_eq!(
            extraction.records.len() + extraction.rejected.len(),
            extraction.candidates
        );
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.rejected.len(), 2);
    }

    #[test]
    fn fullwidth_digits_parse_as_numbers() {
        let text = "Hemoglobin \u{FF11}\u{FF11}.\u{FF10} g/dL 13.0-17.0";
        let extraction = Extractor::default().extract(text, &hemoglobin_store());
        assert!(extraction.rejected.is_empty(), "{:?}", extraction.rejected);
        assert_eq!(extraction.records[0].current_value(), 11.0);
        assert_eq!(extraction.records[0].status(), Status::Low);
    }

    #[test]
    fn digits_from_other_scripts() {
        // Arabic-Indic 9 0, Devanagari 7 0, mathematical bold 1 0 0
        assert_eq!(to_ascii_digits("\u{0669}\u{0660}"), "90");
        assert_eq!(to_ascii_digits("\u{096D}\u{0966}.5"), "70.5");
        assert_eq!(to_ascii_digits("\u{1D7CF}\u{1D7CE}\u{1D7CE}"), "100");
        assert!(matches!(to_ascii_digits("12.5"), Cow::Borrowed("12.5")));
    }

    #[test]
    fn overlong_result_is_kept_as_infinite() {
        let text = format!("Ferritin {} ng/mL 30-400", "9".repeat(400));
        let records = extract(&text, &InMemoryReferenceStore::new());
        assert_eq!(records.len(), 1);
        assert!(records[0].current_value().is_infinite());
        assert_eq!(records[0].status(), Status::High);
    }
}
