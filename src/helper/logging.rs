use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

pub const LOG_FILE: &str = "error.log";

/// Append-only diagnostic log. Every coercion, fallback, and skipped stage is
/// reported here; messages are also kept in memory so the run report can
/// count them without re-reading the file.
pub struct DiagnosticLog {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    messages: Vec<String>,
}

impl DiagnosticLog {
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        let path = dir.join(LOG_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(DiagnosticLog {
            writer: Some(BufWriter::new(file)),
            path: Some(path),
            messages: Vec::new(),
        })
    }

    /// In-memory sink, used when the error-log option is off and in tests.
    pub fn sink() -> Self {
        DiagnosticLog {
            writer: None,
            path: None,
            messages: Vec::new(),
        }
    }

    /// Stop writing to the log file; messages are still captured in memory.
    pub fn disable_file(&mut self) {
        self.writer = None;
    }

    pub fn log(&mut self, message: &str) {
        self.messages.push(message.to_string());
        if let Some(writer) = self.writer.as_mut() {
            let now = Local::now().format("%Y-%m-%d %H:%M:%S");
            // a failing log write never takes the run down
            let _ = writeln!(writer, "[{}] {}", now, message);
            let _ = writer.flush();
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
