use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use crate::helper::aggregate;
use crate::helper::annotation;
use crate::helper::config::{self, Configuration, RawConfig};
use crate::helper::error::SetupError;
use crate::helper::io;
use crate::helper::logging::DiagnosticLog;
use crate::helper::master;
use crate::helper::metadata::MetadataIndex;
use crate::helper::metric::{self, ExtractedValues, Metric};
use crate::helper::plot;
use crate::helper::report::{MetricOutcome, RunReport};
use crate::helper::stats::{self, RscriptEngine, SignificanceEngine, StatsTable};

/// Run the full comparison analysis on one input directory. Setup failures
/// abort; everything after setup degrades per metric and is reported in the
/// diagnostic log and the run report.
pub fn run(input: &Path, metadata_name: &str, config_name: &str) -> Result<RunReport, SetupError> {
    if !input.is_dir() {
        return Err(SetupError::NotADirectory(input.display().to_string()));
    }
    io::remove_old_log(input);
    let mut log = DiagnosticLog::open(input)?;

    let config_path = input.join(config_name);
    if !config_path.is_file() {
        log.log(&format!(
            "{} not found. Creating one with default options...",
            config_name
        ));
        config::write_default_config(&config_path)?;
    }
    let raw = RawConfig::from_file(&config_path)?;
    let (config, notes) = config::resolve(&raw);
    config::log_notes(&notes, &mut log);
    if !config.error_log {
        log.disable_file();
    }

    if config.overwrite {
        io::remove_prefixed(input, "post_")?;
    }

    let metadata = match MetadataIndex::from_file(&input.join(metadata_name), &mut log) {
        Ok(index) => index,
        Err(e) => {
            log.log(&format!("Attention: {}", e));
            return Err(e);
        }
    };

    let sample_files = io::find_sample_files(input, metadata_name)?;
    if sample_files.len() < 2 {
        let err = SetupError::TooFewSampleFiles(sample_files.len());
        log.log(&format!("Attention: {}", err));
        return Err(err);
    }

    let mut report = RunReport::new(&input.display().to_string(), config.clone());

    let bar = ProgressBar::new(sample_files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} sample files")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let mut extracted: Vec<(String, ExtractedValues)> = Vec::new();
    for path in &sample_files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match fs::read_to_string(path) {
            Ok(contents) => {
                extracted.push((name.to_string(), metric::extract(&contents, name, &mut log)));
            }
            Err(e) => log.log(&format!("{} could not be read and was skipped: {}", name, e)),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let engine = RscriptEngine;
    let engine_available = match RscriptEngine::check_installed() {
        Ok(()) => true,
        Err(e) => {
            log.log(&format!(
                "Statistics are unavailable for this run, plots will not be annotated: {}",
                e
            ));
            false
        }
    };

    // fixed metric sequence: the built-ins, then each attribute column
    let mut metrics = vec![Metric::Clonality, Metric::ReceptorFraction];
    for (index, name) in metadata.attribute_names().iter().enumerate() {
        metrics.push(Metric::Arbitrary {
            name: name.clone(),
            index,
        });
    }

    for metric_kind in &metrics {
        if let Some(outcome) = process_metric(
            metric_kind,
            &extracted,
            &metadata,
            &config,
            input,
            engine_available,
            &engine,
            &mut log,
        ) {
            report.add_outcome(outcome);
        }
    }

    if let Err(e) = master::combine(input, config.masterfile) {
        log.log(&format!("Could not write the master statistics file: {}", e));
    }
    if let Err(e) = io::remove_prefixed(input, "pre_") {
        log.log(&format!("Could not remove intermediate tables: {}", e));
    }

    for message in log.messages() {
        report.add_warning(message.clone());
    }
    report.finish();
    if let Err(e) = report.write_json(&input.join("run_report.json")) {
        log.log(&format!("Could not write the run report: {}", e));
    }
    Ok(report)
}

/// One metric: aggregate, dispatch statistics, lay out annotations, render.
/// Returns `None` when the metric has no valid data at all.
fn process_metric(
    metric_kind: &Metric,
    extracted: &[(String, ExtractedValues)],
    metadata: &MetadataIndex,
    config: &Configuration,
    input: &Path,
    engine_available: bool,
    engine: &dyn SignificanceEngine,
    log: &mut DiagnosticLog,
) -> Option<MetricOutcome> {
    let (grouped, samples) = match metric_kind {
        Metric::Clonality => {
            let values: Vec<(String, Option<f64>)> = extracted
                .iter()
                .map(|(sample, values)| (sample.clone(), values.clonality))
                .collect();
            aggregate::aggregate(&values, metadata, log)
        }
        Metric::ReceptorFraction => {
            let values: Vec<(String, Option<f64>)> = extracted
                .iter()
                .map(|(sample, values)| (sample.clone(), values.receptor_fraction))
                .collect();
            aggregate::aggregate(&values, metadata, log)
        }
        Metric::Arbitrary { index, .. } => aggregate::aggregate_attribute(metadata, *index, log),
    };
    if grouped.is_empty() {
        log.log(&format!(
            "No valid data for {}; the metric was skipped.",
            metric_kind
        ));
        return None;
    }

    let mut outcome = MetricOutcome::new(metric_kind);
    outcome.set_groups_plotted(grouped.len());
    outcome.set_values_used(grouped.values().map(|v| v.len()).sum());

    let table: Option<StatsTable> = if config.overwrite {
        if engine_available {
            match stats::dispatch(&grouped, &samples, metric_kind, config, input, engine) {
                Ok(table) => {
                    outcome.set_statistics_completed(true);
                    Some(table)
                }
                Err(e) => {
                    log.log(&format!("Statistics for {} were skipped: {}", metric_kind, e));
                    None
                }
            }
        } else {
            None
        }
    } else {
        // append mode reuses the previous run's result tables
        match stats::read_stats_table(&input.join(stats::result_file_name(metric_kind))) {
            Ok(table) => Some(table),
            Err(e) => {
                log.log(&format!(
                    "No statistics available for {}: {}",
                    metric_kind, e
                ));
                None
            }
        }
    };

    let series = aggregate::ordered_series(&grouped, config.custom_order);
    let order: Vec<String> = series.iter().map(|(label, _)| label.clone()).collect();

    let placements = match (&table, aggregate::value_range(&grouped)) {
        (Some(table), Some(range)) if config.annotation => annotation::layout(
            &table.comparisons,
            &order,
            range,
            config.correction,
            config.custom_order,
            log,
        ),
        _ => Vec::new(),
    };
    outcome.set_annotations_drawn(placements.len());

    let summary = table.as_ref().map(|t| &t.summary);
    let output = input.join(metric_kind.image_name());
    match plot::render(&series, &placements, summary, metric_kind, config, &output) {
        Ok(()) => {
            outcome.set_plot_written(true);
        }
        Err(e) => log.log(&format!(
            "Could not save the plot for {}: {}",
            metric_kind, e
        )),
    }
    Some(outcome)
}
