use std::error::Error;
use std::path::Path;

use chrono::{DateTime, Local};
use getset::{Getters, Setters};
use serde::{Deserialize, Serialize};

use crate::helper::config::Configuration;
use crate::helper::metric::Metric;

/// End-of-run summary written as `run_report.json` next to the plots.
#[derive(Debug, Clone, Serialize, Deserialize, Getters, Setters)]
pub struct RunReport {
    #[getset(get = "pub", set = "pub")]
    process_start_time: DateTime<Local>,
    #[getset(get = "pub", set = "pub")]
    current_version: String,
    #[getset(get = "pub", set = "pub")]
    input_directory: String,
    #[getset(get = "pub", set = "pub")]
    configuration: Configuration,
    #[getset(get = "pub", set = "pub")]
    metric_outcomes: Vec<MetricOutcome>,
    warnings: Vec<String>,
    process_end_time: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Getters, Setters)]
pub struct MetricOutcome {
    #[getset(get = "pub", set = "pub")]
    metric: String,
    #[getset(get = "pub", set = "pub")]
    groups_plotted: usize,
    #[getset(get = "pub", set = "pub")]
    values_used: usize,
    #[getset(get = "pub", set = "pub")]
    statistics_completed: bool,
    #[getset(get = "pub", set = "pub")]
    annotations_drawn: usize,
    #[getset(get = "pub", set = "pub")]
    plot_written: bool,
}

impl MetricOutcome {
    pub fn new(metric: &Metric) -> Self {
        MetricOutcome {
            metric: metric.file_stem(),
            groups_plotted: 0,
            values_used: 0,
            statistics_completed: false,
            annotations_drawn: 0,
            plot_written: false,
        }
    }
}

impl RunReport {
    pub fn new(input_directory: &str, configuration: Configuration) -> Self {
        RunReport {
            process_start_time: Local::now(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            input_directory: input_directory.to_string(),
            configuration,
            metric_outcomes: Vec::new(),
            warnings: Vec::new(),
            process_end_time: Local::now(),
        }
    }

    pub fn add_outcome(&mut self, outcome: MetricOutcome) {
        self.metric_outcomes.push(outcome);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn finish(&mut self) {
        self.process_end_time = Local::now();
    }

    pub fn write_json(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_round_trips_through_json() {
        let mut report = RunReport::new("/data/run1", Configuration::default());
        let mut outcome = MetricOutcome::new(&Metric::Clonality);
        outcome.set_groups_plotted(2);
        outcome.set_statistics_completed(true);
        report.add_outcome(outcome);
        report.add_warning("one coercion".to_string());
        report.finish();

        let json = serde_json::to_string(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.metric_outcomes().len(), 1);
        assert_eq!(parsed.metric_outcomes()[0].metric(), "clonality");
        assert_eq!(parsed.warnings().len(), 1);
    }
}
