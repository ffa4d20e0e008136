//! Raw ingested rows.
//!
//! A [`RowTable`] keeps the header order of the source spreadsheet and stores
//! every row as a vector of [`Value`] cells aligned with those headers. Column
//! lookup works both by position (the fixed stock/cost/price offsets) and by
//! name (category, brand, ...). Tables are immutable once built; sessions swap
//! whole tables behind an `Arc` instead of editing them in place.

use std::collections::HashMap;

use crate::data::Value;

pub type Row = Vec<Value>;

#[derive(Debug, Clone, Default)]
pub struct RowTable {
    headers: Vec<String>,
    rows: Vec<Row>,
    positions: HashMap<String, usize>,
}

impl RowTable {
    /// Builds a table, trimming header names. Short rows read as missing cells.
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        let headers = headers
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();
        let mut positions = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            positions.entry(header.clone()).or_insert(idx);
        }
        Self {
            headers,
            rows,
            positions,
        }
    }

    pub fn empty(headers: Vec<String>) -> Self {
        Self::new(headers, Vec::new())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    pub fn cell_by_name(&self, row: usize, name: &str) -> Option<&Value> {
        self.column_index(name).and_then(|column| self.cell(row, column))
    }
}
