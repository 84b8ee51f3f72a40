use std::collections::HashMap;

use crate::helper::aggregate::strip_leading;
use crate::helper::config::Correction;
use crate::helper::logging::DiagnosticLog;
use crate::helper::stats::{SignificanceRecord, TestKind};

/// Fixed separator between the two group names of a comparison label.
pub const PAIR_SEPARATOR: &str = " - ";

/// Significance marker tier: one, two, or three asterisks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    One,
    Two,
    Three,
}

impl Marker {
    /// p <= 0.001 -> three symbols, p <= 0.01 -> two, p <= 0.05 -> one,
    /// anything larger -> no marker.
    pub fn from_p_value(p: f64) -> Option<Marker> {
        if p <= 0.001 {
            Some(Marker::Three)
        } else if p <= 0.01 {
            Some(Marker::Two)
        } else if p <= 0.05 {
            Some(Marker::One)
        } else {
            None
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Marker::One => "*",
            Marker::Two => "* *",
            Marker::Three => "* * *",
        }
    }
}

/// One rendered significance annotation in plot coordinates. `y1` is the
/// bracket's lower edge (the tick ends), `y2` the horizontal bar above it.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketPlacement {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
    pub marker: Option<Marker>,
    pub center_x: f64,
}

/// Compute non-overlapping bracket placements for the significant
/// comparisons of one metric.
///
/// Brackets stack in statistics-table row order: the first lower edge sits at
/// `max + 0.05 * range`, each subsequent lower edge `0.10 * range` above the
/// previous one, which keeps vertical placement strictly increasing no matter
/// how many brackets are drawn. Horizontal ends are nudged inward so they do
/// not coincide with data points; the offset depends on the comparison
/// regime (two groups vs. three or more).
pub fn layout(
    records: &[SignificanceRecord],
    group_order: &[String],
    value_range: (f64, f64),
    correction: Correction,
    custom_order: bool,
    log: &mut DiagnosticLog,
) -> Vec<BracketPlacement> {
    let two_group = group_order.len() <= 2;
    let expected_test = if two_group {
        TestKind::UTest
    } else {
        TestKind::DunnTest
    };
    let offset = if two_group { 0.05 } else { 0.1 };
    let (min, max) = value_range;
    let range = max - min;

    let translator: HashMap<&str, usize> = group_order
        .iter()
        .enumerate()
        .map(|(i, group)| (group.as_str(), i))
        .collect();

    let mut placements = Vec::new();
    let mut lower_edge = max + 0.05 * range;
    for record in records {
        if !record.significant
            || record.test != expected_test
            || record.correction != correction.label()
        {
            continue;
        }

        let mut pair: Vec<String> = record
            .comparison
            .split(PAIR_SEPARATOR)
            .map(|name| name.trim().to_string())
            .collect();
        if pair.len() != 2 {
            log.log(&format!(
                "Comparison label \"{}\" does not name exactly two groups; its annotation was skipped.",
                record.comparison
            ));
            continue;
        }
        if custom_order {
            pair = pair.iter().map(|name| strip_leading(name)).collect();
        }
        pair.sort();

        let (Some(&left), Some(&right)) = (
            translator.get(pair[0].as_str()),
            translator.get(pair[1].as_str()),
        ) else {
            log.log(&format!(
                "Comparison label \"{}\" names a group that is not on the plot; its annotation was skipped.",
                record.comparison
            ));
            continue;
        };

        let x1 = left as f64 + offset;
        let x2 = right as f64 - offset;
        let y1 = lower_edge;
        let y2 = y1 + 0.01 * range;
        placements.push(BracketPlacement {
            x1,
            x2,
            y1,
            y2,
            marker: Marker::from_p_value(record.p_value),
            center_x: (x1 + x2) / 2.0,
        });
        lower_edge += 0.10 * range;
    }
    placements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        test: TestKind,
        correction: &str,
        comparison: &str,
        p_value: f64,
        significant: bool,
    ) -> SignificanceRecord {
        SignificanceRecord {
            test,
            correction: correction.to_string(),
            comparison: comparison.to_string(),
            p_value,
            significant,
        }
    }

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_marker_tier_boundaries() {
        assert_eq!(Marker::from_p_value(0.05), Some(Marker::One));
        assert_eq!(Marker::from_p_value(0.0500001), None);
        assert_eq!(Marker::from_p_value(0.01), Some(Marker::Two));
        assert_eq!(Marker::from_p_value(0.001), Some(Marker::Three));
        assert_eq!(Marker::from_p_value(0.0009999), Some(Marker::Three));
        assert_eq!(Marker::from_p_value(0.0010001), Some(Marker::Two));
    }

    #[test]
    fn test_two_group_scenario() {
        // A = [0.1, 0.2, 0.3], B = [0.5, 0.6, 0.7], one significant p = 0.03
        let records = vec![record(TestKind::UTest, "None", "A - B", 0.03, true)];
        let order = groups(&["A", "B"]);
        let mut log = DiagnosticLog::sink();
        let placements = layout(
            &records,
            &order,
            (0.1, 0.7),
            Correction::None,
            false,
            &mut log,
        );
        assert_eq!(placements.len(), 1);
        let p = &placements[0];
        let range = 0.7 - 0.1;
        assert!((p.y1 - (0.7 + 0.05 * range)).abs() < 1e-12);
        assert_eq!(p.marker, Some(Marker::One));
        assert!((p.x1 - 0.05).abs() < 1e-12);
        assert!((p.x2 - 0.95).abs() < 1e-12);
        assert!((p.center_x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_four_group_scenario_keeps_table_order() {
        // two significant comparisons among six pairwise tests
        let records = vec![
            record(TestKind::DunnTest, "None", "A - B", 0.2, false),
            record(TestKind::DunnTest, "None", "A - C", 0.004, true),
            record(TestKind::DunnTest, "None", "A - D", 0.3, false),
            record(TestKind::DunnTest, "None", "B - C", 0.6, false),
            record(TestKind::DunnTest, "None", "B - D", 0.03, true),
            record(TestKind::DunnTest, "None", "C - D", 0.9, false),
        ];
        let order = groups(&["A", "B", "C", "D"]);
        let mut log = DiagnosticLog::sink();
        let placements = layout(
            &records,
            &order,
            (0.0, 1.0),
            Correction::None,
            false,
            &mut log,
        );
        assert_eq!(placements.len(), 2);
        // table order, not p-value order
        assert_eq!(placements[0].marker, Some(Marker::Two));
        assert_eq!(placements[1].marker, Some(Marker::One));
        assert!(placements[1].y1 > placements[0].y1);
        // multi-group regime uses the wider inward offset
        assert!((placements[0].x1 - 0.1).abs() < 1e-12);
        assert!((placements[0].x2 - 1.9).abs() < 1e-12);
    }

    #[test]
    fn test_vertical_stacking_is_strictly_increasing() {
        let records: Vec<SignificanceRecord> = (0..5)
            .map(|i| {
                let pair = ["A - B", "A - C", "B - C", "A - D", "B - D"][i];
                record(TestKind::DunnTest, "None", pair, 0.01, true)
            })
            .collect();
        let order = groups(&["A", "B", "C", "D"]);
        let mut log = DiagnosticLog::sink();
        let placements = layout(
            &records,
            &order,
            (0.2, 0.8),
            Correction::None,
            false,
            &mut log,
        );
        assert_eq!(placements.len(), 5);
        for pair in placements.windows(2) {
            assert!(pair[1].y1 > pair[0].y1);
            assert!((pair[1].y1 - pair[0].y1 - 0.10 * 0.6).abs() < 1e-9);
        }
    }

    #[test]
    fn test_layout_is_idempotent() {
        let records = vec![
            record(TestKind::DunnTest, "BH", "A - C", 0.004, true),
            record(TestKind::DunnTest, "BH", "B - C", 0.03, true),
        ];
        let order = groups(&["A", "B", "C"]);
        let mut log = DiagnosticLog::sink();
        let first = layout(
            &records,
            &order,
            (0.0, 1.0),
            Correction::BH,
            false,
            &mut log,
        );
        let second = layout(
            &records,
            &order,
            (0.0, 1.0),
            Correction::BH,
            false,
            &mut log,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_correction_mismatch_filtered_silently() {
        let records = vec![record(TestKind::DunnTest, "Bonferroni", "A - B", 0.01, true)];
        let order = groups(&["A", "B", "C"]);
        let mut log = DiagnosticLog::sink();
        let placements = layout(
            &records,
            &order,
            (0.0, 1.0),
            Correction::BH,
            false,
            &mut log,
        );
        assert!(placements.is_empty());
        assert!(log.messages().is_empty());
    }

    #[test]
    fn test_unknown_group_skipped_with_warning() {
        let records = vec![
            record(TestKind::DunnTest, "None", "A - X", 0.01, true),
            record(TestKind::DunnTest, "None", "A - B", 0.02, true),
        ];
        let order = groups(&["A", "B", "C"]);
        let mut log = DiagnosticLog::sink();
        let placements = layout(
            &records,
            &order,
            (0.0, 1.0),
            Correction::None,
            false,
            &mut log,
        );
        // the skipped comparison leaves no vertical gap behind
        assert_eq!(placements.len(), 1);
        assert!((placements[0].y1 - 1.05).abs() < 1e-12);
        assert_eq!(log.messages().len(), 1);
    }

    #[test]
    fn test_malformed_pair_label_skipped_with_warning() {
        let records = vec![record(TestKind::DunnTest, "None", "A-B-C", 0.01, true)];
        let order = groups(&["A", "B", "C"]);
        let mut log = DiagnosticLog::sink();
        let placements = layout(
            &records,
            &order,
            (0.0, 1.0),
            Correction::None,
            false,
            &mut log,
        );
        assert!(placements.is_empty());
        assert_eq!(log.messages().len(), 1);
    }

    #[test]
    fn test_custom_order_strips_comparison_labels() {
        let records = vec![record(TestKind::DunnTest, "None", "1ALPHA - 2BETA", 0.01, true)];
        // plot order labels are already stripped
        let order = groups(&["ALPHA", "BETA", "GAMMA"]);
        let mut log = DiagnosticLog::sink();
        let placements = layout(
            &records,
            &order,
            (0.0, 1.0),
            Correction::None,
            true,
            &mut log,
        );
        assert_eq!(placements.len(), 1);
        assert!((placements[0].x1 - 0.1).abs() < 1e-12);
        assert!((placements[0].x2 - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_pair_names_sorted_before_lookup() {
        let records = vec![record(TestKind::DunnTest, "None", "C - A", 0.01, true)];
        let order = groups(&["A", "B", "C"]);
        let mut log = DiagnosticLog::sink();
        let placements = layout(
            &records,
            &order,
            (0.0, 1.0),
            Correction::None,
            false,
            &mut log,
        );
        assert_eq!(placements.len(), 1);
        // x1 anchors to A (index 0), x2 to C (index 2)
        assert!(placements[0].x1 < placements[0].x2);
        assert!((placements[0].x1 - 0.1).abs() < 1e-12);
        assert!((placements[0].x2 - 1.9).abs() < 1e-12);
    }
}
