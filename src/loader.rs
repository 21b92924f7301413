//! Source table loading.
//!
//! [`read_table`] reports why a source could not be used; [`load_or_empty`]
//! turns that report into a logged notice plus an empty [`Table`] so the rest
//! of the pipeline keeps running on degenerate input.

use std::{collections::HashSet, io, path::Path};

use anyhow::Context;
use encoding_rs::Encoding;
use log::{debug, info, warn};

use crate::{error::LoadError, frame::Table, io_utils};

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: encoding_rs::UTF_8,
        }
    }
}

pub fn read_table(path: &Path, options: ReadOptions) -> Result<Table, LoadError> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    debug!(
        "Reading {:?} with delimiter '{}'",
        path,
        io_utils::printable_delimiter(delimiter)
    );
    let mut reader = match io_utils::open_csv_reader_from_path(path, delimiter) {
        Ok(reader) => reader,
        Err(err) => {
            let not_found = err
                .downcast_ref::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
            return Err(if not_found {
                LoadError::MissingResource {
                    path: path.to_path_buf(),
                }
            } else {
                malformed(path, err)
            });
        }
    };

    let headers = io_utils::reader_headers(&mut reader, options.encoding)
        .map_err(|err| malformed(path, err))?;
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::EmptyResource {
            path: path.to_path_buf(),
        });
    }
    let headers = dedupe_headers(headers);

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let decoded = record
            .with_context(|| format!("Reading row {}", row_idx + 2))
            .and_then(|record| io_utils::decode_record(&record, options.encoding))
            .map_err(|err| malformed(path, err))?;
        rows.push(decoded);
    }
    if rows.is_empty() {
        return Err(LoadError::EmptyResource {
            path: path.to_path_buf(),
        });
    }

    let table = Table::from_text(headers, rows);
    info!(
        "Loaded {} row(s) across {} column(s) from {:?}",
        table.row_count(),
        table.headers().len(),
        path
    );
    Ok(table)
}

/// Loads a source, degrading any failure to an empty table. The failure is
/// logged and handed back so the caller can show it.
pub fn load_or_empty(path: &Path, options: ReadOptions) -> (Table, Option<LoadError>) {
    match read_table(path, options) {
        Ok(table) => (table, None),
        Err(err) => {
            warn!("{err}");
            (Table::empty(), Some(err))
        }
    }
}

fn malformed(path: &Path, err: anyhow::Error) -> LoadError {
    LoadError::Malformed {
        path: path.to_path_buf(),
        message: format!("{err:#}"),
    }
}

/// Repeated header names get a `.N` suffix so every column stays addressable.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .map(|raw| {
            let name = raw.trim().to_string();
            let mut candidate = name.clone();
            let mut counter = 1usize;
            while seen.contains(&candidate) {
                candidate = format!("{name}.{counter}");
                counter += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}
