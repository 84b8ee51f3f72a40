use std::collections::HashMap;
use std::path::Path;

use itertools::Itertools;

use crate::helper::error::SetupError;
use crate::helper::logging::DiagnosticLog;

/// One row of the group-assignment table. Groups are stored upper-cased;
/// attribute cells keep their raw text until a metric aggregation parses them.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    pub group: String,
    pub sample: String,
    pub attributes: Vec<String>,
}

/// Immutable sample-to-group assignment plus the optional arbitrary
/// per-sample attributes. Built once at startup.
#[derive(Debug, Clone)]
pub struct MetadataIndex {
    rows: Vec<MetadataRow>,
    sample_to_group: HashMap<String, String>,
    attribute_names: Vec<String>,
}

impl MetadataIndex {
    pub fn from_file(path: &Path, log: &mut DiagnosticLog) -> Result<Self, SetupError> {
        if !path.is_file() {
            return Err(SetupError::MetadataNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, log)
    }

    pub fn parse(text: &str, log: &mut DiagnosticLog) -> Result<Self, SetupError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = reader.records();

        let header = match records.next() {
            Some(Ok(header)) => header,
            _ => return Err(SetupError::MissingHeader),
        };
        if header.len() < 2 || header.iter().any(|cell| cell.trim().is_empty()) {
            return Err(SetupError::MissingHeader);
        }

        // attribute headers become output file names
        let attribute_names: Vec<String> = header
            .iter()
            .skip(2)
            .map(sanitize_attribute_name)
            .collect();

        let mut rows = Vec::new();
        for record in records {
            let Ok(record) = record else {
                log.log("Found an unreadable row in the metadata file; the row was skipped.");
                continue;
            };
            if record.iter().all(|cell| cell.trim().is_empty()) {
                log.log("Found a blank row in the metadata file; the row was skipped.");
                continue;
            }
            let group = record.get(0).unwrap_or("").trim();
            let sample = record.get(1).unwrap_or("").trim();
            if group.is_empty() {
                return Err(SetupError::BlankGroup);
            }
            if sample.is_empty() {
                return Err(SetupError::BlankSample);
            }
            let attributes = (0..attribute_names.len())
                .map(|i| record.get(i + 2).unwrap_or("").trim().to_string())
                .collect();
            rows.push(MetadataRow {
                group: group.to_uppercase(),
                sample: sample.to_string(),
                attributes,
            });
        }

        let mut sample_to_group = HashMap::new();
        for row in &rows {
            if sample_to_group.contains_key(&row.sample) {
                log.log(&format!(
                    "Sample \"{}\" appears more than once in the metadata; only the first assignment was kept.",
                    row.sample
                ));
                continue;
            }
            sample_to_group.insert(row.sample.clone(), row.group.clone());
        }

        let distinct_groups = rows.iter().map(|row| &row.group).unique().count();
        if distinct_groups < 2 {
            return Err(SetupError::TooFewGroups);
        }

        Ok(MetadataIndex {
            rows,
            sample_to_group,
            attribute_names,
        })
    }

    pub fn group_of(&self, sample: &str) -> Option<&str> {
        self.sample_to_group.get(sample).map(|s| s.as_str())
    }

    pub fn rows(&self) -> &[MetadataRow] {
        &self.rows
    }

    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }
}

/// Strip characters that are illegal in file names; attribute names double as
/// output file stems.
pub fn sanitize_attribute_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !r#"/\:*?"<>|"#.contains(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_groups_build() {
        let mut log = DiagnosticLog::sink();
        let text = "GROUPS\tSAMPLE FILES\nControl\ts1.tsv\nTreated\ts2.tsv\n";
        let index = MetadataIndex::parse(text, &mut log).unwrap();
        assert_eq!(index.rows().len(), 2);
        assert_eq!(index.group_of("s1.tsv"), Some("CONTROL"));
        assert_eq!(index.group_of("s2.tsv"), Some("TREATED"));
        assert!(index.attribute_names().is_empty());
    }

    #[test]
    fn test_single_group_is_setup_error() {
        let mut log = DiagnosticLog::sink();
        let text = "GROUPS\tSAMPLE FILES\nControl\ts1.tsv\ncontrol\ts2.tsv\n";
        let result = MetadataIndex::parse(text, &mut log);
        assert!(matches!(result, Err(SetupError::TooFewGroups)));
    }

    #[test]
    fn test_blank_group_cell_is_setup_error() {
        let mut log = DiagnosticLog::sink();
        let text = "GROUPS\tSAMPLE FILES\n\ts1.tsv\nTreated\ts2.tsv\n";
        let result = MetadataIndex::parse(text, &mut log);
        assert!(matches!(result, Err(SetupError::BlankGroup)));
    }

    #[test]
    fn test_blank_sample_cell_is_setup_error() {
        let mut log = DiagnosticLog::sink();
        let text = "GROUPS\tSAMPLE FILES\nControl\t\nTreated\ts2.tsv\n";
        let result = MetadataIndex::parse(text, &mut log);
        assert!(matches!(result, Err(SetupError::BlankSample)));
    }

    #[test]
    fn test_blank_header_cell_is_setup_error() {
        let mut log = DiagnosticLog::sink();
        let text = "GROUPS\t\nControl\ts1.tsv\nTreated\ts2.tsv\n";
        let result = MetadataIndex::parse(text, &mut log);
        assert!(matches!(result, Err(SetupError::MissingHeader)));
    }

    #[test]
    fn test_blank_row_skipped_with_warning() {
        let mut log = DiagnosticLog::sink();
        let text = "GROUPS\tSAMPLE FILES\nControl\ts1.tsv\n\t\nTreated\ts2.tsv\n";
        let index = MetadataIndex::parse(text, &mut log).unwrap();
        assert_eq!(index.rows().len(), 2);
        assert_eq!(log.messages().len(), 1);
    }

    #[test]
    fn test_attribute_headers_are_sanitized() {
        let mut log = DiagnosticLog::sink();
        let text = "GROUPS\tSAMPLE FILES\tviral:load?\nControl\ts1.tsv\t4.2\nTreated\ts2.tsv\t9.9\n";
        let index = MetadataIndex::parse(text, &mut log).unwrap();
        assert_eq!(index.attribute_names(), &["viralload".to_string()]);
        assert_eq!(index.rows()[0].attributes, vec!["4.2".to_string()]);
    }

    #[test]
    fn test_duplicate_sample_keeps_first_assignment() {
        let mut log = DiagnosticLog::sink();
        let text = "GROUPS\tSAMPLE FILES\nControl\ts1.tsv\nTreated\ts1.tsv\nTreated\ts2.tsv\n";
        let index = MetadataIndex::parse(text, &mut log).unwrap();
        assert_eq!(index.group_of("s1.tsv"), Some("CONTROL"));
        assert_eq!(log.messages().len(), 1);
    }
}
