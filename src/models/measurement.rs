use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseFloatError;

/// Marker used by the upstream CSV for a reading the instrument did not report.
pub const MISSING_MARKER: &str = "-";

/// A single instrument reading that may be missing.
///
/// The value of an absent measurement is always `0.0`, so two absent
/// measurements compare equal and encode to identical bytes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub struct Measurement {
    value: f64,
    present: bool,
}

impl Measurement {
    pub const ABSENT: Measurement = Measurement {
        value: 0.0,
        present: false,
    };

    pub fn present(value: f64) -> Self {
        Self {
            value,
            present: true,
        }
    }

    pub fn absent() -> Self {
        Self::ABSENT
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn value(&self) -> Option<f64> {
        self.present.then_some(self.value)
    }

    /// Stored value, `0.0` when absent.
    pub fn raw_value(&self) -> f64 {
        self.value
    }

    /// Parse an upstream CSV cell. `-` and the empty string are absent readings.
    pub fn parse(text: &str) -> std::result::Result<Self, ParseFloatError> {
        let text = text.trim();
        if text.is_empty() || text == MISSING_MARKER {
            return Ok(Self::ABSENT);
        }
        text.parse::<f64>().map(Self::present)
    }
}

impl PartialEq for Measurement {
    fn eq(&self, other: &Self) -> bool {
        match (self.present, other.present) {
            (false, false) => true,
            (true, true) => {
                self.value == other.value || (self.value.is_nan() && other.value.is_nan())
            }
            _ => false,
        }
    }
}

impl From<Option<f64>> for Measurement {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::ABSENT, Self::present)
    }
}

impl From<Measurement> for Option<f64> {
    fn from(measurement: Measurement) -> Self {
        measurement.value()
    }
}

/// Export rendering: two decimals when present, empty otherwise.
impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "{:.2}", value),
            None => Ok(()),
        }
    }
}
