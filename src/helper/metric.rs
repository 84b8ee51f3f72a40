use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::helper::logging::DiagnosticLog;

/// A tracked measurement. The two built-ins are constrained to [0,1];
/// arbitrary attributes are open-range and named by their metadata column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metric {
    Clonality,
    ReceptorFraction,
    Arbitrary { name: String, index: usize },
}

impl Metric {
    /// Stem used for the per-metric statistics files.
    pub fn file_stem(&self) -> String {
        match self {
            Metric::Clonality => "clonality".to_string(),
            Metric::ReceptorFraction => "tcell".to_string(),
            Metric::Arbitrary { index, .. } => format!("arb{}", index + 1),
        }
    }

    pub fn axis_label(&self) -> String {
        match self {
            Metric::Clonality => "CLONALITY".to_string(),
            Metric::ReceptorFraction => "% T CELL RECEPTOR".to_string(),
            Metric::Arbitrary { name, .. } => name.to_uppercase(),
        }
    }

    pub fn image_name(&self) -> String {
        match self {
            Metric::Clonality => "CLONALITY.png".to_string(),
            Metric::ReceptorFraction => "TCELL_GRAPH.png".to_string(),
            Metric::Arbitrary { name, .. } => format!("{}.png", name.to_uppercase()),
        }
    }

    /// Whether values are constrained to the closed interval [0,1].
    pub fn unit_bounded(&self) -> bool {
        !matches!(self, Metric::Arbitrary { .. })
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}

/// Values pulled from one per-sample result file. `None` means missing:
/// absent, marked not-available, or outside the valid range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedValues {
    pub clonality: Option<f64>,
    pub receptor_fraction: Option<f64>,
}

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(clonality|percentReceptor)=(.*)$").unwrap());

/// Scan a sample file's contents for the built-in metric markers. Every
/// coercion to missing is logged with the originating sample identifier.
pub fn extract(contents: &str, sample_id: &str, log: &mut DiagnosticLog) -> ExtractedValues {
    let mut values = ExtractedValues::default();
    for line in contents.lines() {
        let Some(caps) = MARKER_RE.captures(line.trim_end()) else {
            continue;
        };
        let raw = caps.get(2).map_or("", |m| m.as_str()).trim();
        match caps.get(1).map_or("", |m| m.as_str()) {
            "clonality" => {
                values.clonality = coerce_unit_value(raw, sample_id, "Clonality", log);
            }
            "percentReceptor" => {
                values.receptor_fraction = coerce_unit_value(raw, sample_id, "Tcell", log);
                // the receptor marker is the last line consumed from a sample file
                break;
            }
            _ => {}
        }
    }
    values
}

/// Coerce a raw marker value to a number in [0,1], or to missing. Out-of-range
/// values are never clamped.
fn coerce_unit_value(
    raw: &str,
    sample_id: &str,
    label: &str,
    log: &mut DiagnosticLog,
) -> Option<f64> {
    if raw.is_empty() || raw.contains("NA") {
        log.log(&format!(
            "{} - {} value \"{}\" is not available; the sample was not used for this metric.",
            sample_id, label, raw
        ));
        return None;
    }
    match raw.parse::<f64>() {
        Ok(value) if (0.0..=1.0).contains(&value) => Some(value),
        Ok(value) => {
            log.log(&format!(
                "{} - {} value \"{}\" out of range; the sample was not used for this metric.",
                sample_id, label, value
            ));
            None
        }
        Err(_) => {
            log.log(&format!(
                "{} - {} value \"{}\" is not a number; the sample was not used for this metric.",
                sample_id, label, raw
            ));
            None
        }
    }
}
