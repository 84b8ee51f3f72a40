use std::collections::BTreeMap;

use itertools::Itertools;
use itertools::MinMaxResult;
use once_cell::sync::Lazy;

use crate::helper::logging::DiagnosticLog;
use crate::helper::metadata::MetadataIndex;

/// Group name to the valid values collected for it, in group-name order.
/// Missing values never enter this view.
pub type GroupedSeries = BTreeMap<String, Vec<f64>>;

/// One audit record. Unlike `GroupedSeries`, missing values are retained so
/// a run can be reproduced sample by sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub group: String,
    pub sample: String,
    pub value: Option<f64>,
}

pub type SampleSeries = Vec<SampleRecord>;

/// Artifacts of a previous run. These are never samples and are skipped
/// without a warning when they show up in the input directory.
static OUTPUT_ARTIFACTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "post_stats_complete.tsv",
        "post_stats_clonality.tsv",
        "post_stats_tcell.tsv",
    ]
});

pub fn is_output_artifact(name: &str) -> bool {
    OUTPUT_ARTIFACTS.iter().any(|artifact| *artifact == name)
        || (name.starts_with("post_stats_") && name.ends_with(".tsv"))
        || name.starts_with("pre_")
}

/// Split per-sample values into the plotting view and the audit view.
/// Samples absent from the metadata are skipped with a warning unless they
/// are known output artifacts.
pub fn aggregate(
    values: &[(String, Option<f64>)],
    index: &MetadataIndex,
    log: &mut DiagnosticLog,
) -> (GroupedSeries, SampleSeries) {
    let mut grouped: GroupedSeries = BTreeMap::new();
    let mut samples: SampleSeries = Vec::new();
    for (sample, value) in values {
        let Some(group) = index.group_of(sample) else {
            if is_output_artifact(sample) {
                continue;
            }
            log.log(&format!(
                "{} was omitted from analysis because it is not in the metadata.",
                sample
            ));
            continue;
        };
        samples.push(SampleRecord {
            group: group.to_string(),
            sample: sample.clone(),
            value: *value,
        });
        if let Some(v) = value {
            grouped.entry(group.to_string()).or_default().push(*v);
        }
    }
    (grouped, samples)
}

/// Aggregate one arbitrary attribute column straight from the metadata.
/// Empty cells are absent (not an error); non-numeric cells become missing.
pub fn aggregate_attribute(
    index: &MetadataIndex,
    attr_index: usize,
    log: &mut DiagnosticLog,
) -> (GroupedSeries, SampleSeries) {
    let mut grouped: GroupedSeries = BTreeMap::new();
    let mut samples: SampleSeries = Vec::new();
    for row in index.rows() {
        let raw = row
            .attributes
            .get(attr_index)
            .map(|s| s.as_str())
            .unwrap_or("");
        if raw.is_empty() {
            continue;
        }
        let value = match raw.parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                log.log(&format!(
                    "{} - attribute value \"{}\" is not a number; the sample was not used for this metric.",
                    row.sample, raw
                ));
                None
            }
        };
        samples.push(SampleRecord {
            group: row.group.clone(),
            sample: row.sample.clone(),
            value,
        });
        if let Some(v) = value {
            grouped.entry(row.group.clone()).or_default().push(v);
        }
    }
    (grouped, samples)
}

/// Plot-order labels with their values: alphabetical by group name, with the
/// leading character stripped from each label when custom ordering is on.
pub fn ordered_series(grouped: &GroupedSeries, custom_order: bool) -> Vec<(String, Vec<f64>)> {
    grouped
        .iter()
        .map(|(group, values)| {
            let label = if custom_order {
                strip_leading(group)
            } else {
                group.clone()
            };
            (label, values.clone())
        })
        .collect()
}

/// Custom ordering drops the first character of a group label; the stripped
/// form is what appears on the plot axis and in the bracket lookups.
pub fn strip_leading(name: &str) -> String {
    name.chars().skip(1).collect()
}

/// Min and max over every plotted value.
pub fn value_range(grouped: &GroupedSeries) -> Option<(f64, f64)> {
    match grouped
        .values()
        .flatten()
        .copied()
        .minmax_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
    }
}
