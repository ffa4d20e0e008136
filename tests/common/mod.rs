#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use inventory_lens::{data::Value, rows::RowTable};
use tempfile::{TempDir, tempdir};

/// Header row of a typical export: named columns up front, the numeric block
/// (stock, unit cost, total cost, price) at positions 14..=17.
pub const HEADERS: [&str; 18] = [
    "ID",
    "SKU",
    "Producto",
    "Categoría",
    "Marca",
    "Proveedor",
    "F. Creación",
    "Ubicación",
    "Unidad",
    "Código Barras",
    "Línea",
    "Sublínea",
    "Estado",
    "Observaciones",
    "Stock",
    "Costo",
    "Costo Total",
    "Precio",
];

/// One inventory line, with builder-style overrides for the optional columns.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: i64,
    pub sku: String,
    pub product: String,
    pub category: String,
    pub brand: String,
    pub supplier: String,
    pub created: String,
    pub stock: String,
    pub unit_cost: String,
    pub total_cost: String,
    pub price: String,
}

pub fn item(id: i64, stock: i64, total_cost: f64) -> Item {
    Item {
        id,
        sku: format!("SKU-{id:04}"),
        product: format!("Producto {id}"),
        category: "Ferretería".to_string(),
        brand: "ACME".to_string(),
        supplier: "Distribuidora Norte".to_string(),
        created: String::new(),
        stock: stock.to_string(),
        unit_cost: "1".to_string(),
        total_cost: total_cost.to_string(),
        price: "2".to_string(),
    }
}

impl Item {
    pub fn product(mut self, name: &str) -> Self {
        self.product = name.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn brand(mut self, brand: &str) -> Self {
        self.brand = brand.to_string();
        self
    }

    pub fn supplier(mut self, supplier: &str) -> Self {
        self.supplier = supplier.to_string();
        self
    }

    pub fn created(mut self, created: &str) -> Self {
        self.created = created.to_string();
        self
    }

    pub fn pricing(mut self, unit_cost: f64, price: f64) -> Self {
        self.unit_cost = unit_cost.to_string();
        self.price = price.to_string();
        self
    }

    pub fn raw_stock(mut self, stock: &str) -> Self {
        self.stock = stock.to_string();
        self
    }

    pub fn raw_total_cost(mut self, total_cost: &str) -> Self {
        self.total_cost = total_cost.to_string();
        self
    }

    fn cells(&self) -> Vec<String> {
        let mut cells = vec![String::new(); HEADERS.len()];
        cells[0] = self.id.to_string();
        cells[1] = self.sku.clone();
        cells[2] = self.product.clone();
        cells[3] = self.category.clone();
        cells[4] = self.brand.clone();
        cells[5] = self.supplier.clone();
        cells[6] = self.created.clone();
        cells[14] = self.stock.clone();
        cells[15] = self.unit_cost.clone();
        cells[16] = self.total_cost.clone();
        cells[17] = self.price.clone();
        cells
    }
}

/// Builds a row table with the standard header layout.
pub fn inventory(items: &[Item]) -> RowTable {
    inventory_without(items, &[])
}

/// Same as [`inventory`] but with the named columns in `dropped` renamed away,
/// as exports from other tools do.
pub fn inventory_without(items: &[Item], dropped: &[&str]) -> RowTable {
    let headers = HEADERS
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if dropped.contains(name) {
                format!("Extra {idx}")
            } else {
                name.to_string()
            }
        })
        .collect();
    let rows = items
        .iter()
        .map(|item| item.cells().iter().map(|c| Value::from_raw(c)).collect())
        .collect();
    RowTable::new(headers, rows)
}

/// Renders items as a CSV export, optionally preceded by a title line.
pub fn inventory_csv(items: &[Item], title: Option<&str>) -> String {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    if let Some(title) = title {
        writer.write_record([title]).expect("title row");
    }
    writer.write_record(HEADERS).expect("header row");
    for item in items {
        writer.write_record(item.cells()).expect("data row");
    }
    String::from_utf8(writer.into_inner().expect("flush csv")).expect("utf-8 csv")
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
