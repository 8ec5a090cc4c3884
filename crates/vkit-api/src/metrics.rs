//! # Validation Metrics
//!
//! Outcomes are counted through the `metrics` facade. No recorder is
//! installed here; without one the counters are no-ops.

use vkit_core::Section;

/// Counter incremented once per validated request section.
pub const VALIDATIONS_TOTAL: &str = "vkit_validations_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Invalid,
    /// The body was not JSON.
    Malformed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Malformed => "malformed",
        }
    }
}

pub(crate) fn record(section: Section, outcome: Outcome) {
    ::metrics::counter!(
        VALIDATIONS_TOTAL,
        "section" => section.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}
