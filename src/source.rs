use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::domain::{DataSource, GridError};
use crate::record::{self, Record, Value};

pub type LoadResult = Result<Vec<Record>, GridError>;

#[derive(Debug, PartialEq)]
enum FileType {
    JSON,
    CSV,
    PARQUET,
    ARROW,
}

/// Starts loading `source` on a worker thread. The single result arrives on the
/// returned channel. `Offline` loads nothing.
pub fn spawn_load(source: &DataSource) -> Option<Receiver<LoadResult>> {
    let source = match source {
        DataSource::Offline => return None,
        other => other.clone(),
    };
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("loader".into())
        .spawn(move || {
            let result = load(&source);
            if tx.send(result).is_err() {
                debug!("Grid went away before loading finished");
            }
        });
    match spawned {
        Ok(_) => Some(rx),
        Err(e) => {
            error!("Could not start loader thread: {e}");
            None
        }
    }
}

pub fn load(source: &DataSource) -> LoadResult {
    let start_time = Instant::now();
    let records = match source {
        DataSource::Url(url) => fetch_records(url)?,
        DataSource::File(path) => load_file(path.clone())?,
        DataSource::Offline => Vec::new(),
    };
    info!(
        "Loaded {} records in {}ms",
        records.len(),
        start_time.elapsed().as_millis()
    );
    Ok(records)
}

#[instrument]
pub fn fetch_records(url: &str) -> LoadResult {
    let entries: Vec<serde_json::Value> = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.json())
        .map_err(|e| GridError::fetch(e.to_string()))?;
    debug!("Received {} entries", entries.len());
    Ok(record::records_from_entries(entries))
}

pub fn load_file(path: PathBuf) -> LoadResult {
    let path = get_file_path(path)?;
    match detect_file_type(&path)? {
        FileType::JSON => Ok(record::records_from_json(&fs::read_to_string(&path)?)?),
        FileType::CSV => frame_to_records(load_csv(&path)?),
        FileType::PARQUET => frame_to_records(load_parquet(&path)?),
        FileType::ARROW => frame_to_records(load_arrow(&path)?),
    }
}

fn get_file_path(path: PathBuf) -> Result<PathBuf, GridError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => GridError::FileNotFound,
        ErrorKind::PermissionDenied => GridError::PermissionDenied,
        _ => GridError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(GridError::LoadingFailed("Not a file!".into()));
    }
    debug!("Loading {} ({} bytes)", path.display(), metadata.len());
    Ok(path)
}

fn detect_file_type(path: &Path) -> Result<FileType, GridError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("JSON") => Ok(FileType::JSON),
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(GridError::UnknownFileType),
    }
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Values of one column, numeric columns as numbers, everything else as text.
fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<Option<Value>>, PolarsError> {
    let column = df.column(col_name)?;
    if is_numeric_type(column.dtype()) {
        let col = column.cast(&DataType::Float64)?;
        Ok(col.f64()?.into_iter().map(|v| v.map(Value::Number)).collect())
    } else {
        let col = column.cast(&DataType::String)?;
        Ok(col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| Value::Text(s.to_string())))
            .collect())
    }
}

/// Turns a frame into records, converting each column on its own rayon worker.
/// Null cells become missing fields.
fn frame_to_records(frame: LazyFrame) -> LoadResult {
    let df = frame.collect()?;
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    let columns: Result<Vec<Vec<Option<Value>>>, _> = names
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = columns?;

    let mut records = vec![Record::with_capacity(names.len()); df.height()];
    for (name, values) in names.iter().zip(columns) {
        for (record, value) in records.iter_mut().zip(values) {
            if let Some(value) = value {
                record.insert(name.clone(), value);
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tmp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tg-{}-{name}", std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn detects_file_types() {
        assert_eq!(detect_file_type(Path::new("a.json")).unwrap(), FileType::JSON);
        assert_eq!(detect_file_type(Path::new("a.CSV")).unwrap(), FileType::CSV);
        assert_eq!(detect_file_type(Path::new("a.pq")).unwrap(), FileType::PARQUET);
        assert_eq!(detect_file_type(Path::new("a.feather")).unwrap(), FileType::ARROW);
        assert!(matches!(
            detect_file_type(Path::new("a.txt")),
            Err(GridError::UnknownFileType)
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = load_file(PathBuf::from("/definitely/not/here.json"));
        assert!(matches!(result, Err(GridError::FileNotFound)));
    }

    #[test]
    fn loads_json_file() {
        let path = write_tmp(
            "states.json",
            r#"[{"state": "Ohio", "population": 11799448}, {"state": "Utah"}]"#,
        );
        let records = load_file(path.clone()).unwrap();
        fs::remove_file(path).ok();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["population"], Value::Number(11799448.0));
        assert!(records[1].get("population").is_none());
    }

    #[test]
    fn loads_csv_file_with_typed_columns() {
        let path = write_tmp("states.csv", "state,population\nOhio,11799448\nUtah,\n");
        let records = load_file(path.clone()).unwrap();
        fs::remove_file(path).ok();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["state"], Value::Text("Ohio".into()));
        assert_eq!(records[0]["population"], Value::Number(11799448.0));
        assert!(records[1].get("population").is_none());
    }

    #[test]
    fn offline_source_spawns_nothing() {
        assert!(spawn_load(&DataSource::Offline).is_none());
    }
}
