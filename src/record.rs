//! The parsed lab result and its classification.

use crate::reference::PriorResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a result relative to its reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Low,
    Normal,
    High,
}

impl Status {
    /// Classify `value` against the inclusive range `low..=high`.
    ///
    /// `Low` is checked first, so an inverted range (`low > high`) reports
    /// `Low` for values under `low`.
    pub fn classify(value: f64, low: f64, high: f64) -> Self {
        if value < low {
            Status::Low
        } else if value > high {
            Status::High
        } else {
            Status::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Low => "Low",
            Status::Normal => "Normal",
            Status::High => "High",
        }
    }

    /// `true` for `Low` and `High`.
    pub fn is_abnormal(&self) -> bool {
        *self != Status::Normal
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One test line of a report, parsed and compared with its prior value.
///
/// Built once by [`LabResultRecord::new`], which derives `status` and
/// `change`; the fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabResultRecord {
    test_name: String,
    unit: String,
    current_value: f64,
    reference_low: f64,
    reference_high: f64,
    status: Status,
    previous_value: Option<f64>,
    previous_date: Option<String>,
    change: Option<f64>,
}

impl LabResultRecord {
    pub fn new(
        test_name: impl Into<String>,
        unit: impl Into<String>,
        current_value: f64,
        reference_low: f64,
        reference_high: f64,
        prior: Option<PriorResult>,
    ) -> Self {
        let (previous_value, previous_date) = match prior {
            Some(p) => (Some(p.value), Some(p.date)),
            None => (None, None),
        };

        Self {
            test_name: test_name.into(),
            unit: unit.into(),
            current_value,
            reference_low,
            reference_high,
            status: Status::classify(current_value, reference_low, reference_high),
            previous_value,
            previous_date,
            change: previous_value.map(|prev| current_value - prev),
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn current_value(&self) -> f64 {
        self.current_value
    }

    pub fn reference_low(&self) -> f64 {
        self.reference_low
    }

    pub fn reference_high(&self) -> f64 {
        self.reference_high
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn previous_value(&self) -> Option<f64> {
        self.previous_value
    }

    pub fn previous_date(&self) -> Option<&str> {
        self.previous_date.as_deref()
    }

    /// `current - previous`; `None` exactly when there is no prior value.
    pub fn change(&self) -> Option<f64> {
        self.change
    }

    /// The printed normal range, e.g. `13.0 - 17.0`.
    pub fn reference_range(&self) -> String {
        format!(
            "{} - {}",
            format_value(self.reference_low),
            format_value(self.reference_high)
        )
    }
}

/// Format a number the way report columns show it.
///
/// Integral values keep one decimal place (`13.0`, `150000.0`), others use
/// the shortest representation that round-trips. Magnitudes below `1e-4` or
/// from `1e16` up switch to exponent form with a signed two-digit exponent
/// (`1e-05`, `2.5e+16`).
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = value.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{value:e}");
        return match sci.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => sci,
        };
    }

    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
