//! Engine configuration.
//!
//! Everything here has a built-in default matching the layout of the
//! inventory exports the engine was written for, so a missing or empty YAML
//! file is a valid configuration. A config file only needs to list what it
//! overrides:
//!
//! ```yaml
//! columns:
//!   stock_index: 3
//!   category: Family
//! limits:
//!   page_size: 50
//! ```

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub columns: ColumnLayout,
    pub limits: ResultLimits,
    pub ingest: IngestPolicy,
}

/// Where the engine finds its inputs inside a row.
///
/// The four numeric columns are addressed by position because exports keep
/// them at fixed offsets while their header text varies between stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub stock_index: usize,
    pub unit_cost_index: usize,
    pub total_cost_index: usize,
    pub price_index: usize,
    pub id: String,
    pub sku: String,
    pub product: String,
    pub category: String,
    pub brand: String,
    pub supplier: String,
    pub created_at: String,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            stock_index: 14,
            unit_cost_index: 15,
            total_cost_index: 16,
            price_index: 17,
            id: "ID".to_string(),
            sku: "SKU".to_string(),
            product: "Producto".to_string(),
            category: "Categoría".to_string(),
            brand: "Marca".to_string(),
            supplier: "Proveedor".to_string(),
            created_at: "F. Creación".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultLimits {
    pub page_size: usize,
    pub top_groups: usize,
    pub alerts: usize,
    pub top_products: usize,
}

impl Default for ResultLimits {
    fn default() -> Self {
        Self {
            page_size: 20,
            top_groups: 15,
            alerts: 100,
            top_products: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestPolicy {
    /// A header candidate with fewer columns is rejected.
    pub min_columns: usize,
    /// Leading rows to skip before the header, tried in order.
    pub header_skip_candidates: Vec<usize>,
    pub default_inventory: Option<PathBuf>,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self {
            min_columns: 10,
            header_skip_candidates: vec![1, 0, 2],
            default_inventory: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let mut raw = String::new();
        file.read_to_string(&mut raw)
            .with_context(|| format!("Reading config file {path:?}"))?;
        Self::from_yaml_str(&raw).with_context(|| format!("Parsing config file {path:?}"))
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parses and validates a YAML document; an empty document yields the defaults.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_yaml::to_string(self).context("Serializing config")?;
        let mut file =
            File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.limits.page_size > 0, "limits.page_size must be positive");
        ensure!(
            !self.ingest.header_skip_candidates.is_empty(),
            "ingest.header_skip_candidates must list at least one offset"
        );
        Ok(())
    }
}
