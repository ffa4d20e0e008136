//! Stock health and ABC value classification.

use std::{cmp::Ordering, fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of the critical tier.
pub const CRITICAL_MAX: i64 = 5;
/// Upper bound (inclusive) of the low tier.
pub const LOW_MAX: i64 = 20;
/// Upper bound (inclusive) of the optimal tier; anything above is overstock.
pub const OPTIMAL_MAX: i64 = 100;

/// Cumulative value share (percent) that still counts as class A.
pub const ABC_A_MAX_PCT: f64 = 80.0;
/// Cumulative value share (percent) that still counts as class B.
pub const ABC_B_MAX_PCT: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Negative,
    OutOfStock,
    Critical,
    Low,
    Optimal,
    Overstock,
}

impl StockStatus {
    /// Canonical display order, from most to least urgent.
    pub const ALL: [StockStatus; 6] = [
        StockStatus::Negative,
        StockStatus::OutOfStock,
        StockStatus::Critical,
        StockStatus::Low,
        StockStatus::Optimal,
        StockStatus::Overstock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::Negative => "negative",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Critical => "critical",
            StockStatus::Low => "low",
            StockStatus::Optimal => "optimal",
            StockStatus::Overstock => "overstock",
        }
    }

    /// Statuses that feed the alert listing.
    pub fn is_alert(self) -> bool {
        matches!(
            self,
            StockStatus::Negative | StockStatus::OutOfStock | StockStatus::Critical
        )
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        StockStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| anyhow!("Unknown stock status '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub const ALL: [AbcClass; 3] = [AbcClass::A, AbcClass::B, AbcClass::C];

    pub fn as_str(self) -> &'static str {
        match self {
            AbcClass::A => "A",
            AbcClass::B => "B",
            AbcClass::C => "C",
        }
    }

    fn from_cumulative_pct(pct: f64) -> Self {
        if pct <= ABC_A_MAX_PCT {
            AbcClass::A
        } else if pct <= ABC_B_MAX_PCT {
            AbcClass::B
        } else {
            AbcClass::C
        }
    }
}

impl fmt::Display for AbcClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify_stock_status(stock: i64) -> StockStatus {
    match stock {
        s if s < 0 => StockStatus::Negative,
        0 => StockStatus::OutOfStock,
        s if s <= CRITICAL_MAX => StockStatus::Critical,
        s if s <= LOW_MAX => StockStatus::Low,
        s if s <= OPTIMAL_MAX => StockStatus::Optimal,
        _ => StockStatus::Overstock,
    }
}

/// Assigns an ABC class to every value, returned in the input order.
///
/// Rows are ranked by value descending (ties keep their input order) and
/// classified by the running share of the table total they close. A table
/// whose total is not positive carries no value to rank, so every row is C.
pub fn classify_abc(values: &[f64]) -> Vec<AbcClass> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return vec![AbcClass::C; values.len()];
    }

    let mut order = (0..values.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut classes = vec![AbcClass::C; values.len()];
    let mut cumulative = 0.0;
    for idx in order {
        cumulative += values[idx];
        classes[idx] = AbcClass::from_cumulative_pct(cumulative * 100.0 / total);
    }
    classes
}
