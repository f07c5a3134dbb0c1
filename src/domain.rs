use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use tracing_error::SpanTrace;

pub const DEFAULT_URL: &str = "https://assets.codepen.io/5781725/states-data.json";

pub const HELP_TEXT: &str = "\
tg - sortable, pinnable data grid

Mouse
  click header            sort: ascending -> descending -> original
  alt/ctrl + click header pin / unpin column
  click row               select row

Keys
  <-/->  h/l              move column
  up/down j/k             move row
  PgUp/PgDn Home/End g/G  jump rows
  Enter s                 sort focused column
  p  alt+Enter            pin / unpin focused column
  y                       copy cell
  Y                       copy row
  ?                       help
  Esc                     close popup
  q                       quit
";

#[derive(Debug)]
pub enum GridError {
    IoError(Error),
    PolarsError(PolarsError),
    HttpError(reqwest::Error),
    JsonError(serde_json::Error),
    Fetch { reason: String, trace: SpanTrace },
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl GridError {
    pub fn fetch(reason: impl Into<String>) -> Self {
        GridError::Fetch {
            reason: reason.into(),
            trace: SpanTrace::capture(),
        }
    }
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::IoError(e) => write!(f, "io error: {e}"),
            GridError::PolarsError(e) => write!(f, "polars error: {e}"),
            GridError::HttpError(e) => write!(f, "http error: {e}"),
            GridError::JsonError(e) => write!(f, "invalid json: {e}"),
            GridError::Fetch { reason, .. } => write!(f, "fetch failed: {reason}"),
            GridError::LoadingFailed(reason) => write!(f, "loading failed: {reason}"),
            GridError::FileNotFound => write!(f, "file not found"),
            GridError::PermissionDenied => write!(f, "permission denied"),
            GridError::UnknownFileType => write!(f, "unknown file type"),
        }
    }
}

impl std::error::Error for GridError {}

impl From<Error> for GridError {
    fn from(err: Error) -> Self {
        GridError::IoError(err)
    }
}

impl From<PolarsError> for GridError {
    fn from(err: PolarsError) -> Self {
        GridError::PolarsError(err)
    }
}

impl From<reqwest::Error> for GridError {
    fn from(err: reqwest::Error) -> Self {
        GridError::HttpError(err)
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::JsonError(err)
    }
}

/// Where the records come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Url(String),
    File(PathBuf),
    Offline,
}

#[derive(Debug, Clone, Setters)]
pub struct GridConfig {
    pub source: DataSource,
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            source: DataSource::Url(DEFAULT_URL.to_string()),
            event_poll_time: 100,
            max_column_width: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Exit,
    Help,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    /// Activate the focused header; `true` when the pin modifier was held.
    ActivateFocused(bool),
    /// Pointer press at terminal coordinates (column, row) with the pin modifier flag.
    Click(u16, u16, bool),
    CopyCell,
    CopyRow,
    Resize(usize, usize),
}
