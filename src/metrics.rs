//! Reduction of one file's event stream into a [`Metrics`] record.

use std::fmt;

use tracing::{debug, warn};

use crate::events::{StreamEvent, SummaryFields, TextField};
use crate::extract::{first_integer, last_decimal};

/// Delta text the service sends when a run produced no coverage gain.
pub const COVERAGE_UNCHANGED: &str = "Coverage did not increase";

/// Per-file result. Fields that were never observed stay at `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub initial_coverage: f64,
    pub final_coverage: f64,
    pub lines_covered: f64,
    pub total_lines: f64,
    pub tests_added: f64,
}

/// Event field a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    CalculatedCoverage,
    CoverageIncreased,
    LinesCovered,
    TotalLines,
    TestsAdded,
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CalculatedCoverage => write!(f, "calculatedCoverage"),
            Self::CoverageIncreased => write!(f, "coverageIncreased"),
            Self::LinesCovered => write!(f, "linesCovered"),
            Self::TotalLines => write!(f, "totalLines"),
            Self::TestsAdded => write!(f, "testAdded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningReason {
    Missing,
    NotText,
    NoNumber,
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::NotText => write!(f, "not a string"),
            Self::NoNumber => write!(f, "no number found"),
        }
    }
}

/// Non-fatal diagnostic: a field could not be read and fell back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub field: MetricField,
    pub reason: WarningReason,
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} value {}", self.field, self.reason)
    }
}

/// Fold state for a single work item. Build a fresh one per item.
#[derive(Debug, Default)]
pub struct MetricsReducer {
    metrics: Metrics,
    warnings: Vec<FieldWarning>,
}

impl MetricsReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::CalculatedCoverage { text } => self.apply_calculated_coverage(text),
            StreamEvent::Summary(fields) => self.apply_summary(fields),
            StreamEvent::Unknown { data_type } => {
                debug!(data_type = ?data_type, "Skipping event without metrics");
            }
        }
    }

    pub fn warnings(&self) -> &[FieldWarning] {
        &self.warnings
    }

    pub fn finish(self) -> Metrics {
        self.metrics
    }

    fn apply_calculated_coverage(&mut self, text: &TextField) {
        // No number: keep the previous value.
        if let Some(value) = self.read(MetricField::CalculatedCoverage, text, last_decimal) {
            self.metrics.initial_coverage = value;
        }
    }

    fn apply_summary(&mut self, fields: &SummaryFields) {
        self.metrics.final_coverage =
            if fields.coverage_increased.as_text() == Some(COVERAGE_UNCHANGED) {
                self.metrics.initial_coverage
            } else {
                self.read(MetricField::CoverageIncreased, &fields.coverage_increased, first_integer)
                    .unwrap_or(0.0)
            };

        self.metrics.lines_covered = self
            .read(MetricField::LinesCovered, &fields.lines_covered, first_integer)
            .unwrap_or(0.0);
        self.metrics.total_lines = self
            .read(MetricField::TotalLines, &fields.total_lines, first_integer)
            .unwrap_or(0.0);
        self.metrics.tests_added = self
            .read(MetricField::TestsAdded, &fields.tests_added, first_integer)
            .unwrap_or(0.0);
    }

    fn read(
        &mut self,
        field: MetricField,
        text: &TextField,
        extract: fn(&str) -> Option<f64>,
    ) -> Option<f64> {
        let reason = match text {
            TextField::Text(s) => match extract(s) {
                Some(value) => return Some(value),
                None => WarningReason::NoNumber,
            },
            TextField::NotText => WarningReason::NotText,
            TextField::Missing => WarningReason::Missing,
        };

        let warning = FieldWarning { field, reason };
        warn!("Warning: {}", warning);
        self.warnings.push(warning);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(text: &str) -> StreamEvent {
        StreamEvent::CalculatedCoverage { text: text.into() }
    }

    fn summary(delta: &str, lines: &str, total: &str, added: &str) -> StreamEvent {
        StreamEvent::Summary(SummaryFields {
            coverage_increased: delta.into(),
            lines_covered: lines.into(),
            total_lines: total.into(),
            tests_added: added.into(),
        })
    }

    fn reduce(events: &[StreamEvent]) -> (Metrics, Vec<FieldWarning>) {
        let mut reducer = MetricsReducer::new();
        for event in events {
            reducer.apply(event);
        }
        let warnings = reducer.warnings().to_vec();
        (reducer.finish(), warnings)
    }

    #[test]
    fn empty_stream_yields_zero_metrics() {
        let (metrics, warnings) = reduce(&[]);
        assert_eq!(metrics, Metrics::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn last_number_in_coverage_text_wins() {
        let (metrics, _) = reduce(&[coverage("...running at 12, now 45.5%")]);
        assert_eq!(metrics.initial_coverage, 45.5);
    }

    #[test]
    fn coverage_without_number_keeps_previous_value() {
        let (metrics, warnings) = reduce(&[coverage("30%"), coverage("still computing")]);
        assert_eq!(metrics.initial_coverage, 30.0);
        assert_eq!(
            warnings,
            vec![FieldWarning {
                field: MetricField::CalculatedCoverage,
                reason: WarningReason::NoNumber,
            }]
        );
    }

    #[test]
    fn unchanged_sentinel_carries_initial_coverage_forward() {
        let (metrics, warnings) = reduce(&[
            coverage("Coverage now at 37.5%"),
            summary(COVERAGE_UNCHANGED, "10 lines", "40", "2"),
        ]);
        assert_eq!(metrics.final_coverage, 37.5);
        assert_eq!(metrics.final_coverage, metrics.initial_coverage);
        assert_eq!(metrics.lines_covered, 10.0);
        assert_eq!(metrics.total_lines, 40.0);
        assert_eq!(metrics.tests_added, 2.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn ordering_last_coverage_wins_and_explicit_delta_overrides() {
        let (metrics, _) = reduce(&[coverage("10%"), coverage("20%"), summary("5", "1", "2", "3")]);
        assert_eq!(metrics.initial_coverage, 20.0);
        assert_eq!(metrics.final_coverage, 5.0);
    }

    #[test]
    fn delta_uses_first_integer_only() {
        let (metrics, _) = reduce(&[summary("Coverage increased from 41.5% to 77%", "", "", "")]);
        assert_eq!(metrics.final_coverage, 41.0);
    }

    #[test]
    fn delta_without_digits_falls_back_to_zero() {
        let (metrics, warnings) = reduce(&[coverage("50%"), summary("Coverage went up", "1", "2", "3")]);
        assert_eq!(metrics.final_coverage, 0.0);
        assert_eq!(warnings[0].field, MetricField::CoverageIncreased);
        assert_eq!(warnings[0].reason, WarningReason::NoNumber);
    }

    #[test]
    fn summary_before_coverage_carries_zero() {
        let (metrics, _) = reduce(&[summary(COVERAGE_UNCHANGED, "1", "2", "3")]);
        assert_eq!(metrics.initial_coverage, 0.0);
        assert_eq!(metrics.final_coverage, 0.0);
    }

    #[test]
    fn missing_lines_covered_degrades_only_that_field() {
        let event = StreamEvent::Summary(SummaryFields {
            coverage_increased: "Coverage increased to 64%".into(),
            lines_covered: TextField::Missing,
            total_lines: "120".into(),
            tests_added: "4".into(),
        });
        let (metrics, warnings) = reduce(&[event]);

        assert_eq!(metrics.lines_covered, 0.0);
        assert_eq!(metrics.final_coverage, 64.0);
        assert_eq!(metrics.total_lines, 120.0);
        assert_eq!(metrics.tests_added, 4.0);
        assert_eq!(
            warnings,
            vec![FieldWarning {
                field: MetricField::LinesCovered,
                reason: WarningReason::Missing,
            }]
        );
    }

    #[test]
    fn non_text_fields_do_not_carry_forward() {
        let event = StreamEvent::Summary(SummaryFields {
            coverage_increased: TextField::NotText,
            lines_covered: TextField::NotText,
            total_lines: TextField::Missing,
            tests_added: "1".into(),
        });
        let (metrics, warnings) = reduce(&[coverage("90%"), event]);

        assert_eq!(metrics.initial_coverage, 90.0);
        assert_eq!(metrics.final_coverage, 0.0);
        assert_eq!(metrics.lines_covered, 0.0);
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn last_summary_wins() {
        let (metrics, _) = reduce(&[
            summary("10", "5", "50", "1"),
            coverage("12%"),
            summary(COVERAGE_UNCHANGED, "7", "60", "2"),
        ]);
        assert_eq!(metrics.final_coverage, 12.0);
        assert_eq!(metrics.lines_covered, 7.0);
        assert_eq!(metrics.total_lines, 60.0);
        assert_eq!(metrics.tests_added, 2.0);
    }

    #[test]
    fn unknown_events_change_nothing() {
        let (metrics, warnings) = reduce(&[
            coverage("15%"),
            StreamEvent::Unknown {
                data_type: Some("log".to_string()),
            },
        ]);
        assert_eq!(metrics.initial_coverage, 15.0);
        assert_eq!(metrics.final_coverage, 0.0);
        assert!(warnings.is_empty());
    }
}
