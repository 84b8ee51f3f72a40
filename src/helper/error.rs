use thiserror::Error;

/// Unrecoverable setup failures. Anything that happens after setup degrades
/// per metric instead of aborting the run.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Metadata file not found: {0}")]
    MetadataNotFound(String),
    #[error("Input path is not a valid directory: {0}")]
    NotADirectory(String),
    #[error(
        "There is a missing header in the metadata file. Every column needs a header: column one is GROUPS, column two is SAMPLE FILES, further columns are custom attribute names."
    )]
    MissingHeader,
    #[error("Blank cells in the metadata GROUPS column (column one)")]
    BlankGroup,
    #[error("Blank cells in the metadata SAMPLE FILES column (column two)")]
    BlankSample,
    #[error("Couldn't find enough groups in the metadata. At least two different groups are needed to compare.")]
    TooFewGroups,
    #[error("Found {0} sample file(s) in the input directory. At least 2 are needed.")]
    TooFewSampleFiles(usize),
    #[error("I/O error during setup: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures at the external statistics engine boundary. These skip the
/// affected metric's statistics and annotation only.
#[derive(Error, Debug)]
pub enum StatsEngineError {
    #[error("Rscript is not installed or not found in PATH")]
    EngineNotFound,
    #[error("Statistics engine exited with status {status}: {stderr}")]
    EngineFailure { status: i32, stderr: String },
    #[error("Statistics result file not found: {0}")]
    MissingResult(String),
    #[error("Failed to write intermediate statistics table: {0}")]
    Table(#[from] csv::Error),
    #[error("I/O error while dispatching statistics: {0}")]
    Io(#[from] std::io::Error),
}
