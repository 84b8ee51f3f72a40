use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::helper::logging::DiagnosticLog;

/// Multiple-comparison correction methods understood by the statistics engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Correction {
    None,
    BH,
    Bonferroni,
}

impl Correction {
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_lowercase();
        if lower.contains("bonferroni") {
            Some(Correction::Bonferroni)
        } else if lower.contains("bh") {
            Some(Correction::BH)
        } else if lower.contains("none") {
            Some(Correction::None)
        } else {
            None
        }
    }

    /// Label exactly as it appears in the statistics tables.
    pub fn label(&self) -> &'static str {
        match self {
            Correction::None => "None",
            Correction::BH => "BH",
            Correction::Bonferroni => "Bonferroni",
        }
    }
}

/// Error-bar source. SD and SEM are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorBars {
    None,
    Sd,
    Sem,
}

impl ErrorBars {
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_lowercase();
        if lower.contains("none") {
            Some(ErrorBars::None)
        } else if lower.contains("sem") {
            Some(ErrorBars::Sem)
        } else if lower.contains("sd") {
            Some(ErrorBars::Sd)
        } else {
            None
        }
    }
}

/// Fully resolved plotting/statistics options. Built once at startup and
/// read-only for the remainder of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub correction: Correction,
    pub verbose: bool,
    pub masterfile: bool,
    pub error_log: bool,
    pub overwrite: bool,
    pub title: String,
    pub custom_order: bool,
    pub x_rotation: i32,
    pub boxplots: bool,
    pub box_colors: bool,
    pub box_palette: Option<Vec<usize>>,
    pub strip_plots: bool,
    pub dot_colors: bool,
    pub dot_palette: Option<Vec<usize>>,
    pub jitter: bool,
    pub mean_bars: bool,
    pub error_bars: ErrorBars,
    pub log_scale: bool,
    pub annotation: bool,
    pub dpi: u32,
    pub width: f64,
    pub height: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            correction: Correction::None,
            verbose: false,
            masterfile: true,
            error_log: true,
            overwrite: true,
            title: "ImmunoSEQ Analyzer".to_string(),
            custom_order: false,
            x_rotation: 0,
            boxplots: true,
            box_colors: true,
            box_palette: None,
            strip_plots: true,
            dot_colors: true,
            dot_palette: None,
            jitter: true,
            mean_bars: false,
            error_bars: ErrorBars::None,
            log_scale: false,
            annotation: true,
            dpi: 600,
            width: 8.0,
            height: 5.0,
        }
    }
}

/// Raw section/key-value pairs from a configuration file, before any
/// validation. Sections and keys are matched case-insensitively.
#[derive(Debug, Default, Clone)]
pub struct RawConfig {
    entries: HashMap<(String, String), String>,
}

impl RawConfig {
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        let mut section = String::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                section = line[1..line.len() - 1].trim().to_lowercase();
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.insert(
                    (section.clone(), key.trim().to_lowercase()),
                    value.trim().to_string(),
                );
            }
        }
        RawConfig { entries }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.entries
            .get(&(section.to_lowercase(), key.to_lowercase()))
            .map(|s| s.as_str())
    }
}

/// How one option was resolved. `Defaulted` and `Overridden` are the warning
/// outcomes; `Valid` means the raw value was accepted as given.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Valid,
    Defaulted { given: String },
    Absent,
    Overridden { reason: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionNote {
    pub option: &'static str,
    pub outcome: Outcome,
}

impl ResolutionNote {
    pub fn is_warning(&self) -> bool {
        matches!(
            self.outcome,
            Outcome::Defaulted { .. } | Outcome::Overridden { .. }
        )
    }
}

/// Resolve raw options into a `Configuration`. Never fails: an invalid value
/// falls back to the documented default and is recorded as a warning note.
pub fn resolve(raw: &RawConfig) -> (Configuration, Vec<ResolutionNote>) {
    let d = Configuration::default();
    let mut notes = Vec::new();

    let correction = resolve_option(
        &mut notes,
        "Correction",
        raw.get("statistics", "correction"),
        d.correction,
        Correction::parse,
    );
    let verbose = resolve_option(
        &mut notes,
        "Verbose",
        raw.get("statistics", "verbose"),
        d.verbose,
        parse_bool,
    );
    let mut masterfile = resolve_option(
        &mut notes,
        "Masterfile",
        raw.get("output", "masterfile"),
        d.masterfile,
        parse_bool,
    );
    let error_log = resolve_option(
        &mut notes,
        "Error log",
        raw.get("output", "error log"),
        d.error_log,
        parse_bool,
    );
    let overwrite = resolve_option(
        &mut notes,
        "Overwrite",
        raw.get("output", "overwrite"),
        d.overwrite,
        parse_bool,
    );

    let title = match raw.get("graph_options", "title") {
        Some(value) => {
            notes.push(ResolutionNote {
                option: "Title",
                outcome: Outcome::Valid,
            });
            value.to_string()
        }
        None => {
            notes.push(ResolutionNote {
                option: "Title",
                outcome: Outcome::Absent,
            });
            d.title.clone()
        }
    };

    let custom_order = resolve_option(
        &mut notes,
        "Custom Order",
        raw.get("graph_options", "custom order"),
        d.custom_order,
        parse_bool,
    );
    let x_rotation = resolve_option(
        &mut notes,
        "X-label rotation",
        raw.get("graph_options", "x-label rotation"),
        d.x_rotation,
        |s| s.trim().parse::<i32>().ok().filter(|v| (-90..=90).contains(v)),
    );
    let boxplots = resolve_option(
        &mut notes,
        "Boxplots",
        raw.get("graph_options", "boxplots"),
        d.boxplots,
        parse_bool,
    );
    let box_colors = resolve_option(
        &mut notes,
        "Box colors",
        raw.get("graph_options", "box colors"),
        d.box_colors,
        parse_bool,
    );
    let box_palette = resolve_palette(
        &mut notes,
        "Box color palette",
        raw.get("graph_options", "box color palette"),
    );
    let strip_plots = resolve_option(
        &mut notes,
        "Strip plots",
        raw.get("graph_options", "strip plots"),
        d.strip_plots,
        parse_bool,
    );
    let dot_colors = resolve_option(
        &mut notes,
        "Dot colors",
        raw.get("graph_options", "dot colors"),
        d.dot_colors,
        parse_bool,
    );
    let dot_palette = resolve_palette(
        &mut notes,
        "Dot color palette",
        raw.get("graph_options", "dot color palette"),
    );
    let jitter = resolve_option(
        &mut notes,
        "Jitter",
        raw.get("graph_options", "jitter"),
        d.jitter,
        parse_bool,
    );
    let mean_bars = resolve_option(
        &mut notes,
        "Meanbars",
        raw.get("graph_options", "meanbars"),
        d.mean_bars,
        parse_bool,
    );
    let error_bars = resolve_option(
        &mut notes,
        "Errorbars",
        raw.get("graph_options", "errorbars"),
        d.error_bars,
        ErrorBars::parse,
    );
    let log_scale = resolve_option(
        &mut notes,
        "Logscale",
        raw.get("graph_options", "logscale"),
        d.log_scale,
        parse_bool,
    );
    let annotation = resolve_option(
        &mut notes,
        "Annotation",
        raw.get("graph_options", "annotation"),
        d.annotation,
        parse_bool,
    );
    let dpi = resolve_option(
        &mut notes,
        "DPI",
        raw.get("graph_options", "dpi"),
        d.dpi,
        |s| s.trim().parse::<u32>().ok().filter(|v| (300..=600).contains(v)),
    );
    let width = resolve_option(
        &mut notes,
        "Width",
        raw.get("graph_options", "width"),
        d.width,
        |s| s.trim().parse::<f64>().ok().filter(|v| *v >= 1.0),
    );
    let height = resolve_option(
        &mut notes,
        "Height",
        raw.get("graph_options", "height"),
        d.height,
        |s| s.trim().parse::<f64>().ok().filter(|v| *v >= 1.0),
    );

    // Custom order strips characters from group labels, which makes the
    // per-metric output files incompatible for straightforward concatenation.
    if custom_order && masterfile {
        masterfile = false;
        notes.push(ResolutionNote {
            option: "Masterfile",
            outcome: Outcome::Overridden {
                reason: "Custom Order is enabled, so Masterfile has been set to False",
            },
        });
    }

    let configuration = Configuration {
        correction,
        verbose,
        masterfile,
        error_log,
        overwrite,
        title,
        custom_order,
        x_rotation,
        boxplots,
        box_colors,
        box_palette,
        strip_plots,
        dot_colors,
        dot_palette,
        jitter,
        mean_bars,
        error_bars,
        log_scale,
        annotation,
        dpi,
        width,
        height,
    };
    (configuration, notes)
}

fn resolve_option<T>(
    notes: &mut Vec<ResolutionNote>,
    option: &'static str,
    raw: Option<&str>,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    match raw {
        None => {
            notes.push(ResolutionNote {
                option,
                outcome: Outcome::Absent,
            });
            default
        }
        Some(value) => match parse(value) {
            Some(parsed) => {
                notes.push(ResolutionNote {
                    option,
                    outcome: Outcome::Valid,
                });
                parsed
            }
            None => {
                notes.push(ResolutionNote {
                    option,
                    outcome: Outcome::Defaulted {
                        given: value.to_string(),
                    },
                });
                default
            }
        },
    }
}

fn resolve_palette(
    notes: &mut Vec<ResolutionNote>,
    option: &'static str,
    raw: Option<&str>,
) -> Option<Vec<usize>> {
    match raw {
        None => {
            notes.push(ResolutionNote {
                option,
                outcome: Outcome::Absent,
            });
            None
        }
        Some(value) if value.to_lowercase().contains("none") => {
            notes.push(ResolutionNote {
                option,
                outcome: Outcome::Valid,
            });
            None
        }
        Some(value) => {
            // one-based index list into the adaptive palette, e.g. "1,2,3"
            let parsed: Option<Vec<usize>> = value
                .split(',')
                .map(|tok| {
                    tok.trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|v| *v >= 1)
                        .map(|v| v - 1)
                })
                .collect();
            match parsed {
                Some(indices) if !indices.is_empty() => {
                    notes.push(ResolutionNote {
                        option,
                        outcome: Outcome::Valid,
                    });
                    Some(indices)
                }
                _ => {
                    notes.push(ResolutionNote {
                        option,
                        outcome: Outcome::Defaulted {
                            given: value.to_string(),
                        },
                    });
                    None
                }
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Report non-valid resolutions to the diagnostic log.
pub fn log_notes(notes: &[ResolutionNote], log: &mut DiagnosticLog) {
    for note in notes {
        match &note.outcome {
            Outcome::Valid => {}
            Outcome::Absent => {
                log.log(&format!(
                    "Note: option \"{}\" is absent from the configuration; the default was used.",
                    note.option
                ));
            }
            Outcome::Defaulted { given } => {
                log.log(&format!(
                    "\"{}\" is not a valid value for {}. The default was used.",
                    given, note.option
                ));
            }
            Outcome::Overridden { reason } => {
                log.log(&format!("Note: {}.", reason));
            }
        }
    }
}

/// Write a configuration file populated with the documented defaults.
pub fn write_default_config(path: &Path) -> std::io::Result<()> {
    let mut cfg = String::new();
    cfg.push_str("[statistics]\n");
    cfg.push_str("Correction = None\n");
    cfg.push_str("Verbose = False\n\n");

    cfg.push_str("[output]\n");
    cfg.push_str("Masterfile = True\n");
    cfg.push_str("Error log = True\n");
    cfg.push_str("Overwrite = True\n\n");

    cfg.push_str("[graph_options]\n");
    cfg.push_str("Title = ImmunoSEQ Analyzer\n");
    cfg.push_str("Custom Order = False\n");
    cfg.push_str("X-label rotation = 0\n\n");

    cfg.push_str("Boxplots = True\n");
    cfg.push_str("Box colors = True\n");
    cfg.push_str("Box color palette = None\n\n");

    cfg.push_str("Strip plots = True\n");
    cfg.push_str("Dot colors = True\n");
    cfg.push_str("Dot color palette = None\n");
    cfg.push_str("Jitter = True\n\n");

    cfg.push_str("Meanbars = False\n");
    cfg.push_str("Errorbars = None\n\n");

    cfg.push_str("Logscale = False\n");
    cfg.push_str("Annotation = True\n");
    cfg.push_str("DPI = 600\n");
    cfg.push_str("Width = 8\n");
    cfg.push_str("Height = 5\n");
    fs::write(path, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_for<'a>(notes: &'a [ResolutionNote], option: &str) -> Vec<&'a ResolutionNote> {
        notes.iter().filter(|n| n.option == option).collect()
    }

    #[test]
    fn test_empty_raw_resolves_to_defaults() {
        let (config, notes) = resolve(&RawConfig::default());
        let d = Configuration::default();
        assert_eq!(config.correction, d.correction);
        assert_eq!(config.dpi, d.dpi);
        assert_eq!(config.masterfile, d.masterfile);
        assert!(notes.iter().all(|n| n.outcome == Outcome::Absent));
        assert!(notes.iter().all(|n| !n.is_warning()));
    }

    #[test]
    fn test_invalid_value_defaults_with_exactly_one_warning() {
        let raw = RawConfig::parse("[statistics]\nCorrection = holm\n");
        let (config, notes) = resolve(&raw);
        assert_eq!(config.correction, Correction::None);
        let correction_notes = note_for(&notes, "Correction");
        assert_eq!(correction_notes.len(), 1);
        assert_eq!(
            correction_notes[0].outcome,
            Outcome::Defaulted {
                given: "holm".to_string()
            }
        );
        assert_eq!(notes.iter().filter(|n| n.is_warning()).count(), 1);
    }

    #[test]
    fn test_valid_value_is_marked_valid_not_defaulted() {
        let raw = RawConfig::parse("[statistics]\nCorrection = BH\n");
        let (config, notes) = resolve(&raw);
        assert_eq!(config.correction, Correction::BH);
        assert_eq!(note_for(&notes, "Correction")[0].outcome, Outcome::Valid);
    }

    #[test]
    fn test_rotation_out_of_bounds_defaults() {
        let raw = RawConfig::parse("[graph_options]\nX-label rotation = 120\n");
        let (config, notes) = resolve(&raw);
        assert_eq!(config.x_rotation, 0);
        assert!(note_for(&notes, "X-label rotation")[0].is_warning());

        let raw = RawConfig::parse("[graph_options]\nX-label rotation = -45\n");
        let (config, _) = resolve(&raw);
        assert_eq!(config.x_rotation, -45);
    }

    #[test]
    fn test_dpi_bounds() {
        let (config, _) = resolve(&RawConfig::parse("[graph_options]\nDPI = 299\n"));
        assert_eq!(config.dpi, 600);
        let (config, _) = resolve(&RawConfig::parse("[graph_options]\nDPI = 300\n"));
        assert_eq!(config.dpi, 300);
    }

    #[test]
    fn test_palette_parsing() {
        let (config, _) =
            resolve(&RawConfig::parse("[graph_options]\nBox color palette = 1,2,5\n"));
        assert_eq!(config.box_palette, Some(vec![0, 1, 4]));

        let (config, notes) =
            resolve(&RawConfig::parse("[graph_options]\nBox color palette = 1;2\n"));
        assert_eq!(config.box_palette, None);
        assert!(note_for(&notes, "Box color palette")[0].is_warning());

        let (config, notes) =
            resolve(&RawConfig::parse("[graph_options]\nBox color palette = None\n"));
        assert_eq!(config.box_palette, None);
        assert_eq!(
            note_for(&notes, "Box color palette")[0].outcome,
            Outcome::Valid
        );
    }

    #[test]
    fn test_custom_order_forces_masterfile_off() {
        let raw = RawConfig::parse("[output]\nMasterfile = True\n[graph_options]\nCustom Order = True\n");
        let (config, notes) = resolve(&raw);
        assert!(config.custom_order);
        assert!(!config.masterfile);
        let master_notes = note_for(&notes, "Masterfile");
        assert_eq!(master_notes.len(), 2);
        assert!(matches!(
            master_notes[1].outcome,
            Outcome::Overridden { .. }
        ));
    }

    #[test]
    fn test_error_bars_keywords() {
        let (config, _) = resolve(&RawConfig::parse("[graph_options]\nErrorbars = SEM\n"));
        assert_eq!(config.error_bars, ErrorBars::Sem);
        let (config, _) = resolve(&RawConfig::parse("[graph_options]\nErrorbars = sd\n"));
        assert_eq!(config.error_bars, ErrorBars::Sd);
        let (config, _) = resolve(&RawConfig::parse("[graph_options]\nErrorbars = bands\n"));
        assert_eq!(config.error_bars, ErrorBars::None);
    }

    #[test]
    fn test_default_config_round_trips_without_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.cfg");
        write_default_config(&path).unwrap();
        let raw = RawConfig::from_file(&path).unwrap();
        let (config, notes) = resolve(&raw);
        assert!(notes.iter().all(|n| !n.is_warning()));
        assert!(notes.iter().all(|n| n.outcome == Outcome::Valid));
        assert_eq!(config.dpi, 600);
        assert_eq!(config.width, 8.0);
        assert_eq!(config.error_bars, ErrorBars::None);
    }
}
