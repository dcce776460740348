//! Export and report commands.

use std::path::PathBuf;

use shared::CalendarSystem;

/// Delimited-text export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Txt,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
        }
    }
}

/// Which slice of time a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Monthly,
    Annual,
}

/// Parameters of an export run. The year/month filter is interpreted in
/// `calendar`; both `None` exports everything.
#[derive(Debug, Clone)]
pub struct ExportQuery {
    pub format: ExportFormat,
    pub year: Option<i32>,
    /// 1-based month in the selected calendar.
    pub month: Option<u32>,
    pub calendar: CalendarSystem,
    /// Target directory; defaults to `~/Documents/NepaliWallet`.
    pub output_dir: Option<PathBuf>,
}

/// Outcome of a completed export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub file_path: PathBuf,
    pub filename: String,
    pub transaction_count: usize,
}

/// Parameters of a PDF report run.
#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub period: ReportPeriod,
    /// 1-based month in the selected calendar; required for monthly reports.
    pub month: Option<u32>,
    pub year: i32,
    pub calendar: CalendarSystem,
    pub output_dir: Option<PathBuf>,
}

/// Outcome of a generated report.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub file_path: PathBuf,
    pub filename: String,
    pub transaction_count: usize,
    pub page_count: usize,
}
