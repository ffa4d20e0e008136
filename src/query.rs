//! Filtering, multi-key sorting and pagination over an analysis table.

use std::cmp::Ordering;

use log::debug;
use serde::Serialize;

use crate::{
    analysis::{AnalysisRow, AnalysisTable, NamedColumn},
    classify::{AbcClass, StockStatus},
    data::{NO_BRAND_SENTINEL, is_missing_text, round_to},
    error::EngineResult,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    /// Case-insensitive substring over product, SKU, category and brand.
    pub q: Option<String>,
    pub status: Option<StockStatus>,
    /// Case-insensitive exact category.
    pub category: Option<String>,
    /// Case-insensitive exact brand, or [`NO_BRAND_SENTINEL`] for rows without one.
    pub brand: Option<String>,
}

impl SearchFilters {
    fn text(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    DateAsc,
    DateDesc,
    StockAsc,
    StockDesc,
    ValueAsc,
    ValueDesc,
}

impl SortKey {
    pub fn parse(directive: &str) -> Option<Self> {
        match directive.trim() {
            "date_asc" => Some(SortKey::DateAsc),
            "date_desc" => Some(SortKey::DateDesc),
            "stock_asc" => Some(SortKey::StockAsc),
            "stock_desc" => Some(SortKey::StockDesc),
            "value_asc" => Some(SortKey::ValueAsc),
            "value_desc" => Some(SortKey::ValueDesc),
            _ => None,
        }
    }

    fn compare(self, a: &AnalysisRow, b: &AnalysisRow) -> Ordering {
        match self {
            SortKey::DateAsc => compare_dates(a, b, true),
            SortKey::DateDesc => compare_dates(a, b, false),
            SortKey::StockAsc => a.stock.cmp(&b.stock),
            SortKey::StockDesc => b.stock.cmp(&a.stock),
            SortKey::ValueAsc => a.total_cost.total_cmp(&b.total_cost),
            SortKey::ValueDesc => b.total_cost.total_cmp(&a.total_cost),
        }
    }
}

/// Parses sort directives, accepting comma-separated lists. Unknown
/// directives are skipped.
pub fn parse_sort_keys<S: AsRef<str>>(directives: &[S]) -> Vec<SortKey> {
    directives
        .iter()
        .flat_map(|s| s.as_ref().split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let key = SortKey::parse(s);
            if key.is_none() {
                debug!("Ignoring unknown sort directive '{s}'");
            }
            key
        })
        .collect()
}

/// Rows without a readable date go last in both directions.
fn compare_dates(a: &AnalysisRow, b: &AnalysisRow, ascending: bool) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(left), Some(right)) => {
            if ascending {
                left.cmp(&right)
            } else {
                right.cmp(&left)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_rows(a: &AnalysisRow, b: &AnalysisRow, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = key.compare(a, b);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.index.cmp(&b.index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page,
            limit: limit.max(1),
        }
    }

    pub fn offset(&self) -> Option<usize> {
        self.page.checked_sub(1).map(|p| p.saturating_mul(self.limit))
    }

    pub fn pages_for(&self, total: usize) -> usize {
        total.div_ceil(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    pub results: Vec<ProductView>,
    pub total: usize,
    pub showing: usize,
    pub page: usize,
    pub pages: usize,
}

/// The slice of a row that leaves the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    pub id: i64,
    pub sku: String,
    pub product: String,
    pub category: String,
    pub brand: String,
    pub stock: i64,
    pub value: f64,
    pub status: StockStatus,
    pub abc_class: AbcClass,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl ProductView {
    pub fn project(table: &AnalysisTable, row: &AnalysisRow, include_price: bool) -> Self {
        Self {
            id: row.id,
            sku: row.sku.clone(),
            product: row.product.clone(),
            category: row.category.clone().unwrap_or_default(),
            brand: row.brand.clone().unwrap_or_default(),
            stock: row.stock,
            value: round_to(row.total_cost, 2),
            status: row.stock_status,
            abc_class: row.abc_class,
            created_at: created_at_label(table, row),
            price: include_price.then(|| round_to(row.price, 2)),
        }
    }
}

fn created_at_label(table: &AnalysisTable, row: &AnalysisRow) -> String {
    if let Some(created) = row.created_at {
        return created.format("%d/%m/%Y").to_string();
    }
    let cell = table
        .source()
        .column_index(&table.layout().created_at)
        .and_then(|idx| table.original(row).get(idx));
    if is_missing_text(cell) {
        return String::new();
    }
    cell.map(|v| v.as_display().chars().take(10).collect())
        .unwrap_or_default()
}

fn matches_text(row: &AnalysisRow, needle: &str) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(needle);
    contains(row.product.as_str())
        || contains(row.sku.as_str())
        || row.category.as_deref().is_some_and(contains)
        || row.brand.as_deref().is_some_and(contains)
}

/// Applies every filter (logical AND) and returns matching rows in table order.
pub fn filter_rows<'a>(
    table: &'a AnalysisTable,
    filters: &SearchFilters,
) -> EngineResult<Vec<&'a AnalysisRow>> {
    let needle = SearchFilters::text(&filters.q).map(str::to_lowercase);
    let category = SearchFilters::text(&filters.category).map(str::to_lowercase);
    let brand = SearchFilters::text(&filters.brand);

    if category.is_some() {
        table.require(NamedColumn::Category)?;
    }
    if brand.is_some() {
        table.require(NamedColumn::Brand)?;
    }
    let no_brand = brand == Some(NO_BRAND_SENTINEL);
    let brand = brand.map(str::to_lowercase);

    Ok(table
        .rows()
        .iter()
        .filter(|row| needle.as_deref().is_none_or(|n| matches_text(row, n)))
        .filter(|row| filters.status.is_none_or(|s| row.stock_status == s))
        .filter(|row| {
            category.as_deref().is_none_or(|wanted| {
                row.category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase() == wanted)
            })
        })
        .filter(|row| {
            if no_brand {
                return row.has_fallback_brand();
            }
            brand.as_deref().is_none_or(|wanted| {
                row.brand
                    .as_deref()
                    .is_some_and(|b| b.to_lowercase() == wanted)
            })
        })
        .collect())
}

/// Stable multi-key sort; the first key is the primary one.
pub fn sort_rows(rows: &mut [&AnalysisRow], keys: &[SortKey]) {
    if !keys.is_empty() {
        rows.sort_by(|a, b| compare_rows(a, b, keys));
    }
}

pub fn search(
    table: &AnalysisTable,
    filters: &SearchFilters,
    keys: &[SortKey],
    request: PageRequest,
) -> EngineResult<PageResult> {
    let mut matched = filter_rows(table, filters)?;
    sort_rows(&mut matched, keys);

    let total = matched.len();
    let results = match request.offset() {
        Some(offset) => matched
            .iter()
            .skip(offset)
            .take(request.limit)
            .map(|row| ProductView::project(table, row, true))
            .collect::<Vec<_>>(),
        None => Vec::new(),
    };

    Ok(PageResult {
        showing: results.len(),
        results,
        total,
        page: request.page,
        pages: request.pages_for(total),
    })
}
