use std::fs;
use std::path::Path;
use std::process::Command;

use crate::helper::aggregate::{GroupedSeries, SampleSeries};
use crate::helper::config::Configuration;
use crate::helper::error::StatsEngineError;
use crate::helper::metric::Metric;

pub const PRE_STATS_FILE: &str = "pre_stats.tsv";
pub const PRE_REPRO_FILE: &str = "pre_repro.tsv";
pub const ENGINE_SCRIPT: &str = "clonality.r";

static ENGINE_SOURCE: &str = include_str!("../../resources/r_scripts/clonality.r");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    UTest,
    DunnTest,
}

impl TestKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "utest" => Some(TestKind::UTest),
            "dunntest" => Some(TestKind::DunnTest),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestKind::UTest => "utest",
            TestKind::DunnTest => "dunntest",
        }
    }
}

/// One pairwise test result from the statistics engine. The comparison label
/// decomposes into exactly two group names via the fixed `" - "` separator.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificanceRecord {
    pub test: TestKind,
    pub correction: String,
    pub comparison: String,
    pub p_value: f64,
    pub significant: bool,
}

/// Per-group descriptive statistics, in group-name order. `None` marks a
/// group the engine reported as NA.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSummary {
    pub means: Vec<Option<f64>>,
    pub sd: Vec<Option<f64>>,
    pub sem: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default)]
pub struct StatsTable {
    pub comparisons: Vec<SignificanceRecord>,
    pub summary: GroupSummary,
}

/// Narrow synchronous port to the statistics engine. Keeping the boundary
/// this small lets the Rscript subprocess be swapped for an in-process
/// library without touching the annotation or plotting stages.
pub trait SignificanceEngine {
    fn compute(&self, workdir: &Path) -> Result<(), StatsEngineError>;
}

/// Invokes the bundled R script as a blocking subprocess. Single-shot: no
/// retry, no timeout.
pub struct RscriptEngine;

impl RscriptEngine {
    pub fn check_installed() -> Result<(), StatsEngineError> {
        let output = Command::new("Rscript").arg("--version").output();
        match output {
            Ok(out) if out.status.success() => Ok(()),
            _ => Err(StatsEngineError::EngineNotFound),
        }
    }
}

impl SignificanceEngine for RscriptEngine {
    fn compute(&self, workdir: &Path) -> Result<(), StatsEngineError> {
        let script = workdir.join(ENGINE_SCRIPT);
        if !script.is_file() {
            fs::write(&script, ENGINE_SOURCE)?;
        }
        let output = Command::new("Rscript")
            .arg(ENGINE_SCRIPT)
            .current_dir(workdir)
            .output()
            .map_err(|_| StatsEngineError::EngineNotFound)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(StatsEngineError::EngineFailure {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

pub fn result_file_name(metric: &Metric) -> String {
    format!("post_stats_{}.tsv", metric.file_stem())
}

/// Serialize the grouped and audit views, invoke the engine, and parse its
/// result table back. Any failure here skips only this metric's statistics.
pub fn dispatch(
    grouped: &GroupedSeries,
    samples: &SampleSeries,
    metric: &Metric,
    config: &Configuration,
    workdir: &Path,
    engine: &dyn SignificanceEngine,
) -> Result<StatsTable, StatsEngineError> {
    write_pre_tables(grouped, samples, metric, config, workdir)?;
    engine.compute(workdir)?;
    read_stats_table(&workdir.join(result_file_name(metric)))
}

/// Write the two intermediate tables the engine consumes: the flat
/// (group, value) table tagged with metric/correction/verbosity, and the
/// (sample, group, value) audit table.
pub fn write_pre_tables(
    grouped: &GroupedSeries,
    samples: &SampleSeries,
    metric: &Metric,
    config: &Configuration,
    workdir: &Path,
) -> Result<(), StatsEngineError> {
    let mut stats_wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(workdir.join(PRE_STATS_FILE))?;
    let stem = metric.file_stem();
    stats_wtr.write_record([
        "Group",
        "Value",
        stem.as_str(),
        config.correction.label(),
        if config.verbose { "True" } else { "False" },
    ])?;
    for (group, values) in grouped {
        for value in values {
            let value = value.to_string();
            stats_wtr.write_record([group.as_str(), value.as_str()])?;
        }
    }
    stats_wtr.flush()?;

    let mut repro_wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(workdir.join(PRE_REPRO_FILE))?;
    repro_wtr.write_record(["Sample", "Group", "Value"])?;
    for record in samples {
        let value = record
            .value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "NA".to_string());
        repro_wtr.write_record([record.sample.as_str(), record.group.as_str(), value.as_str()])?;
    }
    repro_wtr.flush()?;
    Ok(())
}

pub fn read_stats_table(path: &Path) -> Result<StatsTable, StatsEngineError> {
    if !path.is_file() {
        return Err(StatsEngineError::MissingResult(path.display().to_string()));
    }
    let text = fs::read_to_string(path)?;
    Ok(parse_stats_table(&text))
}

/// Parse the engine's result table. Comparison rows are tagged by test kind;
/// summary rows carry the `#SUMMARYmean` / `#SDvalue` / `#SEMvalue` markers.
/// Rows that match neither are descriptive output and are not consumed.
pub fn parse_stats_table(text: &str) -> StatsTable {
    let mut table = StatsTable::default();
    for line in text.lines() {
        let fields: Vec<String> = line.trim_end().split('\t').map(unquote).collect();
        let Some(first) = fields.first() else {
            continue;
        };
        match first.as_str() {
            "#SUMMARYmean" => table.summary.means = parse_summary_values(&fields[1..]),
            "#SDvalue" => table.summary.sd = parse_summary_values(&fields[1..]),
            "#SEMvalue" => table.summary.sem = parse_summary_values(&fields[1..]),
            other => {
                let Some(test) = TestKind::parse(other) else {
                    continue;
                };
                if fields.len() < 5 {
                    continue;
                }
                let Ok(p_value) = fields[3].parse::<f64>() else {
                    continue;
                };
                table.comparisons.push(SignificanceRecord {
                    test,
                    correction: fields[1].clone(),
                    comparison: fields[2].clone(),
                    p_value,
                    significant: fields[4].eq_ignore_ascii_case("true"),
                });
            }
        }
    }
    table
}

fn unquote(field: &str) -> String {
    let trimmed = field.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

fn parse_summary_values(fields: &[String]) -> Vec<Option<f64>> {
    fields
        .iter()
        .map(|f| {
            if f == "NA" || f.is_empty() {
                None
            } else {
                f.parse::<f64>().ok()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::aggregate::SampleRecord;

    #[test]
    fn test_result_file_name() {
        assert_eq!(
            result_file_name(&Metric::Clonality),
            "post_stats_clonality.tsv"
        );
        assert_eq!(
            result_file_name(&Metric::Arbitrary {
                name: "load".to_string(),
                index: 0
            }),
            "post_stats_arb1.tsv"
        );
    }

    #[test]
    fn test_parse_stats_table() {
        let text = concat!(
            "\"#SUMMARYmean\"\t\"0.2\"\t\"0.6\"\n",
            "\"#SDvalue\"\t\"0.1\"\t\"NA\"\n",
            "\"#SEMvalue\"\t\"0.05\"\t\"0.02\"\n",
            "\"utest\"\t\"None\"\t\"CONTROL - TREATED\"\t\"0.03\"\t\"TRUE\"\n",
            "\"kruskal\"\t\"omnibus p\"\t\"0.1\"\n",
        );
        let table = parse_stats_table(text);
        assert_eq!(table.summary.means, vec![Some(0.2), Some(0.6)]);
        assert_eq!(table.summary.sd, vec![Some(0.1), None]);
        assert_eq!(table.comparisons.len(), 1);
        let record = &table.comparisons[0];
        assert_eq!(record.test, TestKind::UTest);
        assert_eq!(record.correction, "None");
        assert_eq!(record.comparison, "CONTROL - TREATED");
        assert_eq!(record.p_value, 0.03);
        assert!(record.significant);
    }

    #[test]
    fn test_parse_keeps_table_order() {
        let text = concat!(
            "dunntest\tBH\tA - B\t0.04\tTRUE\n",
            "dunntest\tBH\tA - C\t0.2\tFALSE\n",
            "dunntest\tBH\tB - C\t0.001\tTRUE\n",
        );
        let table = parse_stats_table(text);
        let labels: Vec<&str> = table
            .comparisons
            .iter()
            .map(|r| r.comparison.as_str())
            .collect();
        assert_eq!(labels, vec!["A - B", "A - C", "B - C"]);
    }

    #[test]
    fn test_missing_result_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_stats_table(&dir.path().join("post_stats_clonality.tsv"));
        assert!(matches!(result, Err(StatsEngineError::MissingResult(_))));
    }

    #[test]
    fn test_write_pre_tables() {
        let dir = tempfile::tempdir().unwrap();
        let mut grouped = GroupedSeries::new();
        grouped.insert("CONTROL".to_string(), vec![0.1, 0.2]);
        grouped.insert("TREATED".to_string(), vec![0.6]);
        let samples = vec![
            SampleRecord {
                group: "CONTROL".to_string(),
                sample: "s1.tsv".to_string(),
                value: Some(0.1),
            },
            SampleRecord {
                group: "TREATED".to_string(),
                sample: "s2.tsv".to_string(),
                value: None,
            },
        ];
        let config = Configuration::default();
        write_pre_tables(&grouped, &samples, &Metric::Clonality, &config, dir.path()).unwrap();

        let stats = fs::read_to_string(dir.path().join(PRE_STATS_FILE)).unwrap();
        let mut lines = stats.lines();
        assert_eq!(lines.next().unwrap(), "Group\tValue\tclonality\tNone\tFalse");
        assert_eq!(lines.next().unwrap(), "CONTROL\t0.1");

        let repro = fs::read_to_string(dir.path().join(PRE_REPRO_FILE)).unwrap();
        assert!(repro.contains("s2.tsv\tTREATED\tNA"));
    }
}
