//! Astrological chart inspiration.
//!
//! A [`ChartProvider`] turns a calendar date into a [`ChartReport`]. The
//! pipeline only ever consumes the reduced form produced by
//! [`reduce_to_major_aspects`], which keeps prompt size bounded however many
//! aspects the raw chart contains.

pub mod ephemeris;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

pub use ephemeris::{Location, MeanElementEphemeris};

/// Bodies whose aspects are considered significant.
pub const MAJOR_BODIES: [&str; 10] = [
    "Sun", "Moon", "Mercury", "Venus", "Mars", "Jupiter", "Saturn", "Uranus", "Neptune", "Pluto",
];

/// Aspect kinds considered significant.
pub const MAJOR_ASPECTS: [&str; 5] = ["conjunction", "opposition", "trine", "square", "sextile"];

/// Largest deviation from exact, in degrees, that still counts.
pub const MAJOR_ORB_LIMIT: f64 = 3.0;

/// Line emitted when no aspect survives reduction.
pub const NO_MAJOR_ASPECTS: &str = "No major aspects found.";

/// Errors from chart computation.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Date out of supported range: {0}")]
    InvalidDate(NaiveDate),

    #[error("Failed to parse chart report: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One pairwise angular relationship between two bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectRecord {
    pub p1_name: String,
    pub p2_name: String,
    pub aspect: String,
    /// Signed deviation from the exact aspect angle, in degrees.
    pub orbit: f64,
}

impl AspectRecord {
    pub fn new(p1: impl Into<String>, aspect: impl Into<String>, p2: impl Into<String>, orbit: f64) -> Self {
        Self {
            p1_name: p1.into(),
            p2_name: p2.into(),
            aspect: aspect.into(),
            orbit,
        }
    }

    /// Whether this record passes the major body, kind and orb filters.
    pub fn is_major(&self) -> bool {
        MAJOR_BODIES.contains(&self.p1_name.as_str())
            && MAJOR_BODIES.contains(&self.p2_name.as_str())
            && MAJOR_ASPECTS.contains(&self.aspect.as_str())
            && self.orbit.abs() <= MAJOR_ORB_LIMIT
    }
}

/// A computed chart: a free-text header plus every aspect found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartReport {
    pub header: String,
    #[serde(default)]
    pub aspects: Vec<AspectRecord>,
}

impl ChartReport {
    /// Parse a report produced by an external astrology backend.
    pub fn from_json(json: &str) -> Result<Self, ChartError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Source of astrological charts.
pub trait ChartProvider: Send + Sync {
    /// Compute the chart for `date`.
    fn compute(&self, date: NaiveDate) -> Result<ChartReport, ChartError>;
}

/// Reduce a report to its header followed by the significant aspects only.
pub fn reduce_to_major_aspects(report: &ChartReport) -> String {
    let mut out = String::new();
    out.push_str(report.header.trim_end());
    out.push_str("\n\nMajor Aspects:\n");

    let mut found = false;
    for record in report.aspects.iter().filter(|r| r.is_major()) {
        found = true;
        let _ = writeln!(
            out,
            "- {} {} {} (orb: {:.2}°)",
            record.p1_name, record.aspect, record.p2_name, record.orbit
        );
    }

    if !found {
        out.push_str(NO_MAJOR_ASPECTS);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(aspects: Vec<AspectRecord>) -> ChartReport {
        ChartReport {
            header: "Chart for 2024-03-20".to_string(),
            aspects,
        }
    }

    #[test]
    fn test_reduce_keeps_qualifying_records() {
        let r = report(vec![
            AspectRecord::new("Sun", "trine", "Jupiter", 1.234),
            AspectRecord::new("Moon", "square", "Mars", -2.5),
        ]);
        let reduced = reduce_to_major_aspects(&r);

        assert!(reduced.starts_with("Chart for 2024-03-20\n\nMajor Aspects:\n"));
        assert!(reduced.contains("- Sun trine Jupiter (orb: 1.23°)"));
        assert!(reduced.contains("- Moon square Mars (orb: -2.50°)"));
        assert!(!reduced.contains(NO_MAJOR_ASPECTS));
    }

    #[test]
    fn test_reduce_drops_wide_orbs() {
        let r = report(vec![
            AspectRecord::new("Sun", "conjunction", "Moon", 3.01),
            AspectRecord::new("Venus", "opposition", "Saturn", -4.0),
            AspectRecord::new("Mars", "sextile", "Pluto", 3.0),
        ]);
        let reduced = reduce_to_major_aspects(&r);

        assert!(!reduced.contains("Sun conjunction Moon"));
        assert!(!reduced.contains("Venus opposition Saturn"));
        assert!(reduced.contains("- Mars sextile Pluto (orb: 3.00°)"));
    }

    #[test]
    fn test_reduce_drops_minor_bodies_and_kinds() {
        let r = report(vec![
            AspectRecord::new("Sun", "quincunx", "Moon", 0.1),
            AspectRecord::new("Mean_Node", "trine", "Venus", 0.2),
            AspectRecord::new("Chiron", "square", "Mars", 0.3),
            AspectRecord::new("Sun", "Trine", "Mars", 0.4),
        ]);
        let reduced = reduce_to_major_aspects(&r);

        assert!(reduced.ends_with(&format!("{NO_MAJOR_ASPECTS}\n")));
        assert!(!reduced.contains("- "));
    }

    #[test]
    fn test_reduce_empty_report() {
        let reduced = reduce_to_major_aspects(&report(Vec::new()));
        assert_eq!(
            reduced,
            format!("Chart for 2024-03-20\n\nMajor Aspects:\n{NO_MAJOR_ASPECTS}\n")
        );
    }

    #[test]
    fn test_reduce_preserves_order() {
        let r = report(vec![
            AspectRecord::new("Saturn", "square", "Neptune", 0.5),
            AspectRecord::new("Sun", "sextile", "Moon", 0.5),
        ]);
        let reduced = reduce_to_major_aspects(&r);
        let saturn = reduced.find("Saturn").unwrap();
        let sun = reduced.find("- Sun").unwrap();
        assert!(saturn < sun);
    }

    #[test]
    fn test_report_from_json() {
        let json = r#"{
            "header": "Natal chart",
            "aspects": [
                {"p1_name": "Sun", "p2_name": "Moon", "aspect": "opposition", "orbit": -0.75}
            ]
        }"#;
        let report = ChartReport::from_json(json).unwrap();
        assert_eq!(report.aspects.len(), 1);
        assert_eq!(report.aspects[0].aspect, "opposition");
        assert!(report.aspects[0].is_major());
    }

    #[test]
    fn test_report_from_bad_json() {
        assert!(matches!(ChartReport::from_json("{"), Err(ChartError::Parse(_))));
    }
}
