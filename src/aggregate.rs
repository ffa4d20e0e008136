//! Grouped summaries, KPIs and ranked listings over an analysis table.

use std::{cmp::Ordering, collections::HashMap, fmt};

use itertools::Itertools;
use serde::Serialize;

use crate::{
    analysis::{AnalysisRow, AnalysisTable, NamedColumn},
    classify::{AbcClass, StockStatus},
    data::NO_BRAND_SENTINEL,
    error::EngineResult,
    query::{ProductView, SortKey, sort_rows},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Category,
    Brand,
    Supplier,
    AbcClass,
    StockStatus,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::Brand => "brand",
            Dimension::Supplier => "supplier",
            Dimension::AbcClass => "abc_class",
            Dimension::StockStatus => "stock_status",
        }
    }

    fn required_column(self) -> Option<NamedColumn> {
        match self {
            Dimension::Category => Some(NamedColumn::Category),
            Dimension::Brand => Some(NamedColumn::Brand),
            Dimension::Supplier => Some(NamedColumn::Supplier),
            Dimension::AbcClass | Dimension::StockStatus => None,
        }
    }

    /// Group key of a row. Rows without a supplier have no key and are left
    /// out of supplier groupings; every other dimension always has one.
    fn key(self, row: &AnalysisRow) -> Option<String> {
        match self {
            Dimension::Category => row.category.clone(),
            Dimension::Brand => row.brand.clone(),
            Dimension::Supplier => row.supplier.clone(),
            Dimension::AbcClass => Some(row.abc_class.as_str().to_string()),
            Dimension::StockStatus => Some(row.stock_status.as_str().to_string()),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub count: usize,
    pub stock_sum: i64,
    pub value_sum: f64,
    pub value_pct: f64,
}

#[derive(Default)]
struct GroupAccumulator {
    count: usize,
    stock_sum: i64,
    value_sum: f64,
}

impl GroupAccumulator {
    fn ingest(&mut self, row: &AnalysisRow) {
        self.count += 1;
        self.stock_sum = self.stock_sum.saturating_add(row.stock);
        self.value_sum += row.total_cost;
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Every group of `dimension`, largest value first, ties by key.
///
/// `value_pct` is relative to the sum over the returned groups.
pub fn group_totals(table: &AnalysisTable, dimension: Dimension) -> EngineResult<Vec<GroupSummary>> {
    if let Some(column) = dimension.required_column() {
        table.require(column)?;
    }

    let mut groups: HashMap<String, GroupAccumulator> = HashMap::new();
    for row in table.rows() {
        if let Some(key) = dimension.key(row) {
            groups.entry(key).or_default().ingest(row);
        }
    }

    let total: f64 = groups.values().map(|g| g.value_sum).sum();
    Ok(groups
        .into_iter()
        .sorted_by(|(ka, a), (kb, b)| {
            b.value_sum
                .partial_cmp(&a.value_sum)
                .unwrap_or(Ordering::Equal)
                .then_with(|| ka.cmp(kb))
        })
        .map(|(key, group)| GroupSummary {
            key,
            count: group.count,
            stock_sum: group.stock_sum,
            value_pct: percent(group.value_sum, total),
            value_sum: group.value_sum,
        })
        .collect())
}

/// [`group_totals`] cut down to the `top` largest groups (`0` keeps all).
pub fn group_by(
    table: &AnalysisTable,
    dimension: Dimension,
    top: usize,
) -> EngineResult<Vec<GroupSummary>> {
    let mut groups = group_totals(table, dimension)?;
    if top > 0 {
        groups.truncate(top);
    }
    Ok(groups)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertCounts {
    pub out_of_stock: usize,
    pub negative_stock: usize,
    pub critical: usize,
    pub low: usize,
    pub overstock: usize,
    pub total_alerts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_skus: usize,
    pub active_skus: usize,
    pub inactive_skus: usize,
    pub total_stock: i64,
    pub total_value: f64,
    pub avg_stock: f64,
    /// Mean margin over products that have a positive margin.
    pub avg_margin_pct: f64,
    /// Rows with negative stock: inventory differences to reconcile.
    #[serde(rename = "diferencias_count")]
    pub differences_count: usize,
    #[serde(rename = "diferencias_units")]
    pub differences_units: i64,
    #[serde(rename = "diferencias_value")]
    pub differences_value: f64,
    pub alerts: AlertCounts,
}

pub fn compute_kpis(table: &AnalysisTable) -> Kpis {
    let mut kpis = Kpis::default();
    let mut margin_sum = 0.0;
    let mut margin_rows = 0usize;

    for row in table.rows() {
        kpis.total_skus += 1;
        kpis.total_stock = kpis.total_stock.saturating_add(row.stock);
        kpis.total_value += row.total_cost;
        if row.stock > 0 {
            kpis.active_skus += 1;
        }
        if row.margin_pct > 0.0 {
            margin_sum += row.margin_pct;
            margin_rows += 1;
        }
        match row.stock_status {
            StockStatus::Negative => {
                kpis.alerts.negative_stock += 1;
                kpis.differences_count += 1;
                kpis.differences_units = kpis.differences_units.saturating_add(row.stock);
                kpis.differences_value += row.total_cost;
            }
            StockStatus::OutOfStock => kpis.alerts.out_of_stock += 1,
            StockStatus::Critical => kpis.alerts.critical += 1,
            StockStatus::Low => kpis.alerts.low += 1,
            StockStatus::Overstock => kpis.alerts.overstock += 1,
            StockStatus::Optimal => {}
        }
    }

    kpis.inactive_skus = kpis.total_skus - kpis.active_skus;
    if kpis.total_skus > 0 {
        kpis.avg_stock = kpis.total_stock as f64 / kpis.total_skus as f64;
    }
    if margin_rows > 0 {
        kpis.avg_margin_pct = margin_sum / margin_rows as f64;
    }
    kpis.alerts.total_alerts =
        kpis.alerts.out_of_stock + kpis.alerts.negative_stock + kpis.alerts.critical;
    kpis
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusShare {
    pub status: StockStatus,
    pub count: usize,
    pub percentage: f64,
}

/// Row count per stock status present in the table, most urgent first.
pub fn stock_status_distribution(table: &AnalysisTable) -> Vec<StatusShare> {
    let counts = table.rows().iter().counts_by(|row| row.stock_status);
    let rows = table.len() as f64;
    StockStatus::ALL
        .into_iter()
        .filter_map(|status| {
            counts.get(&status).map(|&count| StatusShare {
                status,
                count,
                percentage: percent(count as f64, rows),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbcShare {
    pub class: AbcClass,
    pub count: usize,
    pub value: f64,
    pub count_pct: f64,
    pub value_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbcSummary {
    pub summary: Vec<AbcShare>,
    pub total_value: f64,
    pub total_products: usize,
}

pub fn abc_summary(table: &AnalysisTable) -> AbcSummary {
    let mut totals: HashMap<AbcClass, GroupAccumulator> = HashMap::new();
    for row in table.rows() {
        totals.entry(row.abc_class).or_default().ingest(row);
    }
    let total_value = table.total_value();
    let total_products = table.len();

    let summary = AbcClass::ALL
        .into_iter()
        .filter_map(|class| {
            totals.get(&class).map(|group| AbcShare {
                class,
                count: group.count,
                value: group.value_sum,
                count_pct: percent(group.count as f64, total_products as f64),
                value_pct: percent(group.value_sum, total_value),
            })
        })
        .collect();

    AbcSummary {
        summary,
        total_value,
        total_products,
    }
}

fn ranked_by_value<'a>(
    table: &'a AnalysisTable,
    keep: impl Fn(&AnalysisRow) -> bool,
    limit: usize,
) -> Vec<&'a AnalysisRow> {
    let mut rows = table.rows().iter().filter(|row| keep(row)).collect::<Vec<_>>();
    sort_rows(&mut rows, &[SortKey::ValueDesc]);
    rows.truncate(limit);
    rows
}

/// Rows that need attention (negative, out of stock, critical), most valuable first.
pub fn alerts(table: &AnalysisTable, limit: usize) -> Vec<ProductView> {
    ranked_by_value(table, |row| row.stock_status.is_alert(), limit)
        .into_iter()
        .map(|row| ProductView::project(table, row, true))
        .collect()
}

/// Most valuable products that are in stock.
pub fn top_products(table: &AnalysisTable, limit: usize) -> Vec<ProductView> {
    ranked_by_value(table, |row| row.stock > 0, limit)
        .into_iter()
        .map(|row| ProductView::project(table, row, false))
        .collect()
}

/// Sorted distinct brands, optionally within one category (case-insensitive).
/// [`NO_BRAND_SENTINEL`] is appended when some row in scope has no brand.
pub fn unique_brands(table: &AnalysisTable, category: Option<&str>) -> EngineResult<Vec<String>> {
    table.require(NamedColumn::Brand)?;
    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_lowercase);
    if category.is_some() {
        table.require(NamedColumn::Category)?;
    }

    let in_scope = table
        .rows()
        .iter()
        .filter(|row| {
            category.as_deref().is_none_or(|wanted| {
                row.category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase() == wanted)
            })
        })
        .collect::<Vec<_>>();

    let mut brands = in_scope
        .iter()
        .filter(|row| !row.has_fallback_brand())
        .filter_map(|row| row.brand.clone())
        .unique()
        .sorted()
        .collect::<Vec<_>>();
    if in_scope.iter().any(|row| row.has_fallback_brand()) {
        brands.push(NO_BRAND_SENTINEL.to_string());
    }
    Ok(brands)
}
