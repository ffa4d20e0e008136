//! Derived analysis table.
//!
//! [`build`] turns a raw [`RowTable`] into an [`AnalysisTable`]: numeric
//! coercion of the positional stock/cost/price columns, text normalization of
//! the named columns, stock status, ABC class and margin. The source table is
//! shared, not copied, so every analysis row can still reach its original
//! cells through [`AnalysisTable::original`].

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::{
    classify::{AbcClass, StockStatus, classify_abc, classify_stock_status},
    config::ColumnLayout,
    data::{
        BRAND_FALLBACK, CATEGORY_FALLBACK, Value, coerce_f64, coerce_i64, finite_or_zero,
        is_missing_text, normalize_text, optional_text, value_to_datetime,
    },
    error::{EngineError, EngineResult},
    rows::RowTable,
};

/// Named columns that some views depend on and that exports may omit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColumn {
    Category,
    Brand,
    Supplier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRow {
    /// Position of the row in the source table.
    pub index: usize,
    pub id: i64,
    pub sku: String,
    pub product: String,
    /// `None` only when the table has no category column.
    pub category: Option<String>,
    /// `None` only when the table has no brand column.
    pub brand: Option<String>,
    /// The brand cell was blank or a missing marker, so `brand` holds the fallback.
    pub brand_missing: bool,
    /// `None` when the column is absent or the cell is blank.
    pub supplier: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub stock: i64,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub price: f64,
    pub stock_status: StockStatus,
    pub abc_class: AbcClass,
    pub margin: f64,
    pub margin_pct: f64,
}

impl AnalysisRow {
    /// True for rows whose brand cell was empty, not for a literal "SIN MARCA".
    pub fn has_fallback_brand(&self) -> bool {
        self.brand_missing
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisTable {
    source: Arc<RowTable>,
    rows: Vec<AnalysisRow>,
    layout: ColumnLayout,
    has_category: bool,
    has_brand: bool,
    has_supplier: bool,
    has_created_at: bool,
}

impl AnalysisTable {
    pub fn rows(&self) -> &[AnalysisRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn source(&self) -> &Arc<RowTable> {
        &self.source
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Original cells of an analysis row.
    pub fn original(&self, row: &AnalysisRow) -> &[Value] {
        self.source
            .row(row.index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_created_at(&self) -> bool {
        self.has_created_at
    }

    pub fn has_column(&self, column: NamedColumn) -> bool {
        match column {
            NamedColumn::Category => self.has_category,
            NamedColumn::Brand => self.has_brand,
            NamedColumn::Supplier => self.has_supplier,
        }
    }

    pub fn column_name(&self, column: NamedColumn) -> &str {
        match column {
            NamedColumn::Category => &self.layout.category,
            NamedColumn::Brand => &self.layout.brand,
            NamedColumn::Supplier => &self.layout.supplier,
        }
    }

    /// Fails with [`EngineError::FeatureUnavailable`] when `column` is absent.
    pub fn require(&self, column: NamedColumn) -> EngineResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(EngineError::FeatureUnavailable {
                column: self.column_name(column).to_string(),
            })
        }
    }

    pub fn total_value(&self) -> f64 {
        self.rows.iter().map(|r| r.total_cost).sum()
    }
}

/// Derives the analysis table. Never fails: bad cells become zero or a fallback.
pub fn build(source: Arc<RowTable>, layout: &ColumnLayout) -> AnalysisTable {
    let table = source.as_ref();
    let category_col = table.column_index(&layout.category);
    let brand_col = table.column_index(&layout.brand);
    let supplier_col = table.column_index(&layout.supplier);
    let sku_col = table.column_index(&layout.sku);
    let product_col = table.column_index(&layout.product);
    let id_col = table.column_index(&layout.id);
    let created_col = table.column_index(&layout.created_at);

    let mut rows = Vec::with_capacity(table.len());
    for (index, cells) in table.rows().iter().enumerate() {
        let cell = |column: Option<usize>| column.and_then(|c| cells.get(c));

        let stock = coerce_i64(cells.get(layout.stock_index));
        let unit_cost = coerce_f64(cells.get(layout.unit_cost_index));
        let total_cost = coerce_f64(cells.get(layout.total_cost_index));
        let price = coerce_f64(cells.get(layout.price_index));

        let margin = finite_or_zero(price - unit_cost);
        let margin_pct = if price > 0.0 {
            finite_or_zero(margin / price * 100.0)
        } else {
            0.0
        };

        rows.push(AnalysisRow {
            index,
            id: coerce_i64(cell(id_col)),
            sku: normalize_text(cell(sku_col), ""),
            product: normalize_text(cell(product_col), ""),
            category: category_col.map(|c| normalize_text(cells.get(c), CATEGORY_FALLBACK)),
            brand: brand_col.map(|c| normalize_text(cells.get(c), BRAND_FALLBACK)),
            brand_missing: brand_col.is_some_and(|c| is_missing_text(cells.get(c))),
            supplier: optional_text(cell(supplier_col)),
            created_at: value_to_datetime(cell(created_col)),
            stock,
            unit_cost,
            total_cost,
            price,
            stock_status: classify_stock_status(stock),
            abc_class: AbcClass::C,
            margin,
            margin_pct,
        });
    }

    let values = rows.iter().map(|r| r.total_cost).collect::<Vec<_>>();
    for (row, class) in rows.iter_mut().zip(classify_abc(&values)) {
        row.abc_class = class;
    }

    AnalysisTable {
        rows,
        layout: layout.clone(),
        has_category: category_col.is_some(),
        has_brand: brand_col.is_some(),
        has_supplier: supplier_col.is_some(),
        has_created_at: created_col.is_some(),
        source,
    }
}
