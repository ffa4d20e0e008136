mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use inventory_lens::{
    analysis::{self, NamedColumn},
    classify::{AbcClass, StockStatus},
    config::ColumnLayout,
    data::{BRAND_FALLBACK, CATEGORY_FALLBACK},
    rows::RowTable,
};
use proptest::prelude::*;

use common::{inventory, inventory_without, item};

#[test]
fn malformed_numeric_cells_coerce_to_zero() {
    let table = inventory(&[
        item(1, 0, 0.0).raw_stock("abc").raw_total_cost("n/a"),
        item(2, 0, 0.0).raw_stock("7.9").raw_total_cost(""),
        item(3, 0, 0.0).raw_stock("-3.5").raw_total_cost("inf"),
    ]);
    let built = analysis::build(Arc::new(table), &ColumnLayout::default());
    let rows = built.rows();

    assert_eq!(rows[0].stock, 0);
    assert_eq!(rows[0].total_cost, 0.0);
    assert_eq!(rows[0].stock_status, StockStatus::OutOfStock);
    assert_eq!(rows[1].stock, 7);
    assert_eq!(rows[1].stock_status, StockStatus::Low);
    assert_eq!(rows[2].stock, -3);
    assert_eq!(rows[2].total_cost, 0.0);
    assert_eq!(rows[2].stock_status, StockStatus::Negative);
}

#[test]
fn margin_is_zero_without_a_positive_price() {
    let table = inventory(&[
        item(1, 10, 100.0).pricing(6.0, 10.0),
        item(2, 10, 100.0).pricing(6.0, 0.0),
        item(3, 10, 100.0).pricing(12.0, 10.0),
    ]);
    let built = analysis::build(Arc::new(table), &ColumnLayout::default());
    let rows = built.rows();

    assert_eq!(rows[0].margin, 4.0);
    assert!((rows[0].margin_pct - 40.0).abs() < 1e-9);
    assert_eq!(rows[1].margin, -6.0);
    assert_eq!(rows[1].margin_pct, 0.0);
    assert!((rows[2].margin_pct + 20.0).abs() < 1e-9);
}

#[test]
fn blank_and_nan_text_falls_back() {
    let table = inventory(&[
        item(1, 1, 1.0).category("").brand("nan"),
        item(2, 1, 1.0).category("  Pinturas ").brand(" Sherwin "),
    ]);
    let built = analysis::build(Arc::new(table), &ColumnLayout::default());

    assert_eq!(built.rows()[0].category.as_deref(), Some(CATEGORY_FALLBACK));
    assert_eq!(built.rows()[0].brand.as_deref(), Some(BRAND_FALLBACK));
    assert!(built.rows()[0].has_fallback_brand());
    assert_eq!(built.rows()[1].category.as_deref(), Some("Pinturas"));
    assert_eq!(built.rows()[1].brand.as_deref(), Some("Sherwin"));
}

#[test]
fn missing_named_columns_are_reported_not_invented() {
    let table = inventory_without(&[item(1, 1, 1.0)], &["Categoría", "Proveedor"]);
    let built = analysis::build(Arc::new(table), &ColumnLayout::default());

    assert!(!built.has_column(NamedColumn::Category));
    assert!(built.has_column(NamedColumn::Brand));
    assert!(built.rows()[0].category.is_none());
    assert!(built.rows()[0].supplier.is_none());
    let err = built.require(NamedColumn::Category).unwrap_err();
    assert!(err.is_feature_unavailable());
    assert!(err.to_string().contains("Categoría"));
}

#[test]
fn abc_classes_follow_cumulative_value_share() {
    // Shares: 70, 15, 10, 5 -> cumulative 70, 85, 95, 100.
    let table = inventory(&[
        item(1, 1, 10.0),
        item(2, 1, 70.0),
        item(3, 1, 5.0),
        item(4, 1, 15.0),
    ]);
    let built = analysis::build(Arc::new(table), &ColumnLayout::default());
    let classes = built.rows().iter().map(|r| r.abc_class).collect::<Vec<_>>();
    assert_eq!(
        classes,
        vec![AbcClass::B, AbcClass::A, AbcClass::C, AbcClass::B]
    );
}

#[test]
fn created_at_reads_day_first_dates() {
    let table = inventory(&[
        item(1, 1, 1.0).created("03/04/2024"),
        item(2, 1, 1.0).created("sin fecha"),
    ]);
    let built = analysis::build(Arc::new(table), &ColumnLayout::default());
    assert!(built.has_created_at());
    assert_eq!(
        built.rows()[0].created_at.map(|d| d.date()),
        NaiveDate::from_ymd_opt(2024, 4, 3)
    );
    assert!(built.rows()[1].created_at.is_none());
}

#[test]
fn original_cells_stay_reachable() {
    let table = Arc::new(inventory(&[item(9, 4, 8.0).product("Taladro")]));
    let built = analysis::build(Arc::clone(&table), &ColumnLayout::default());
    let row = &built.rows()[0];
    assert_eq!(built.original(row)[2].as_display(), "Taladro");
    assert!(Arc::ptr_eq(built.source(), &table));
}

#[test]
fn empty_table_builds_empty_analysis() {
    let headers = common::HEADERS.iter().map(|h| h.to_string()).collect();
    let built = analysis::build(Arc::new(RowTable::empty(headers)), &ColumnLayout::default());
    assert!(built.is_empty());
    assert_eq!(built.total_value(), 0.0);
}

#[test]
fn custom_layout_moves_the_numeric_block() {
    let headers = vec!["Stock".to_string(), "Valor".to_string(), "Marca".to_string()];
    let rows = vec![vec!["12".into(), "30.5".into(), "ACME".into()]];
    let layout = ColumnLayout {
        stock_index: 0,
        total_cost_index: 1,
        unit_cost_index: 7,
        price_index: 8,
        ..ColumnLayout::default()
    };
    let built = analysis::build(Arc::new(RowTable::new(headers, rows)), &layout);
    let row = &built.rows()[0];
    assert_eq!(row.stock, 12);
    assert_eq!(row.total_cost, 30.5);
    assert_eq!(row.price, 0.0);
    assert_eq!(row.brand.as_deref(), Some("ACME"));
}

proptest! {
    #[test]
    fn abc_is_monotonic_along_value_order(values in prop::collection::vec(0u32..10_000, 1..60)) {
        let items = values
            .iter()
            .enumerate()
            .map(|(idx, v)| item(idx as i64, 1, f64::from(*v)))
            .collect::<Vec<_>>();
        let built = analysis::build(Arc::new(inventory(&items)), &ColumnLayout::default());

        let mut ordered = built.rows().iter().collect::<Vec<_>>();
        ordered.sort_by(|a, b| b.total_cost.total_cmp(&a.total_cost).then(a.index.cmp(&b.index)));
        let rank = |class: AbcClass| match class {
            AbcClass::A => 0,
            AbcClass::B => 1,
            AbcClass::C => 2,
        };
        for pair in ordered.windows(2) {
            prop_assert!(rank(pair[0].abc_class) <= rank(pair[1].abc_class));
        }
    }
}
