//! Reads a delimited inventory export into a [`RowTable`].
//!
//! Exports often carry a title row above the real header. The loader tries
//! each configured number of leading rows to skip and keeps the first layout
//! that looks like an inventory: enough columns and at least one data row.
//! Only sparse rows (titles, blank lines) may be skipped; a row with at least
//! `min_columns` filled cells is a header or data and is never dropped.

use std::path::Path;

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;
use log::debug;

use crate::{
    config::IngestPolicy,
    data::Value,
    io_utils,
    rows::{Row, RowTable},
};

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions<'a> {
    pub delimiter: Option<u8>,
    pub encoding: Option<&'a str>,
}

#[derive(Debug)]
pub struct LoadedInventory {
    pub table: RowTable,
    /// File stem, used as the session's source name.
    pub source_name: String,
    /// Leading rows skipped before the header.
    pub skipped_rows: usize,
}

pub fn load_inventory(
    path: &Path,
    policy: &IngestPolicy,
    options: LoadOptions<'_>,
) -> Result<LoadedInventory> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    let encoding = io_utils::resolve_encoding(options.encoding)?;
    let records = read_records(path, delimiter, encoding)
        .with_context(|| format!("Reading inventory from {path:?}"))?;

    let (skipped_rows, table) = detect_layout(records, policy)
        .with_context(|| format!("Detecting the header row of {path:?}"))?;
    let source_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("inventario")
        .to_string();

    Ok(LoadedInventory {
        table,
        source_name,
        skipped_rows,
    })
}

fn read_records(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<Vec<String>>> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let mut records = Vec::new();
    for (line, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading record {}", line + 1))?;
        records.push(
            io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding record {}", line + 1))?,
        );
    }
    Ok(records)
}

/// Picks the header position among `policy.header_skip_candidates`.
pub fn detect_layout(
    records: Vec<Vec<String>>,
    policy: &IngestPolicy,
) -> Result<(usize, RowTable)> {
    for &skip in &policy.header_skip_candidates {
        let Some(header) = records.get(skip) else {
            debug!("Header candidate after {skip} skipped row(s): out of range");
            continue;
        };
        let columns = header.len();
        let data_rows = records.len().saturating_sub(skip + 1);
        if records[..skip].iter().any(|row| filled_cells(row) >= policy.min_columns) {
            debug!("Header candidate after {skip} skipped row(s) rejected: it would skip a full row");
            continue;
        }
        if columns >= policy.min_columns && data_rows > 0 {
            debug!(
                "Header candidate after {skip} skipped row(s) accepted: {columns} column(s), {data_rows} row(s)"
            );
            return Ok((skip, build_table(&records, skip, columns)));
        }
        debug!(
            "Header candidate after {skip} skipped row(s) rejected: {columns} column(s), {data_rows} row(s)"
        );
    }
    bail!(
        "No header layout with at least {} columns and one data row (tried skipping {:?})",
        policy.min_columns,
        policy.header_skip_candidates
    )
}

fn filled_cells(row: &[String]) -> usize {
    row.iter().filter(|cell| !cell.trim().is_empty()).count()
}

fn build_table(records: &[Vec<String>], skip: usize, columns: usize) -> RowTable {
    let headers = records[skip].iter().map(|h| h.trim().to_string()).collect();
    let rows = records[skip + 1..]
        .iter()
        .filter(|record| record.iter().any(|cell| !cell.trim().is_empty()))
        .map(|record| {
            let mut row: Row = record.iter().map(|cell| Value::from_raw(cell)).collect();
            row.resize(columns, Value::Null);
            row
        })
        .collect();
    RowTable::new(headers, rows)
}
