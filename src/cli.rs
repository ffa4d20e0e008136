use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::aggregate::Dimension;

#[derive(Debug, Parser)]
#[command(author, version, about = "Inventory analytics over spreadsheet exports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load an inventory export and report what was ingested
    Load(SourceArgs),
    /// Headline indicators: SKU counts, stock, value, margin and alert tiers
    Kpis(SourceArgs),
    /// Row count per stock status
    Status(SourceArgs),
    /// ABC classification summary by inventory value
    Abc(SourceArgs),
    /// Largest groups by inventory value for one dimension
    Group(GroupArgs),
    /// Distinct brands, optionally within one category
    Brands(BrandsArgs),
    /// Filter, sort and page through products
    Search(SearchArgs),
    /// Products with negative, zero or critical stock, most valuable first
    Alerts(SourceArgs),
    /// Most valuable products in stock
    Top(SourceArgs),
    /// Every dashboard view in a single document
    Analysis(SourceArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Inventory export to analyze (falls back to the configured default inventory)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// YAML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum GroupDimension {
    Category,
    Brand,
    Supplier,
    Abc,
    Status,
}

impl From<GroupDimension> for Dimension {
    fn from(value: GroupDimension) -> Self {
        match value {
            GroupDimension::Category => Dimension::Category,
            GroupDimension::Brand => Dimension::Brand,
            GroupDimension::Supplier => Dimension::Supplier,
            GroupDimension::Abc => Dimension::AbcClass,
            GroupDimension::Status => Dimension::StockStatus,
        }
    }
}

#[derive(Debug, Args)]
pub struct GroupArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Dimension to group by
    #[arg(short = 'b', long = "by", value_enum)]
    pub by: GroupDimension,
}

#[derive(Debug, Args)]
pub struct BrandsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Restrict to brands sold in this category
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Case-insensitive text matched against product, SKU, category and brand
    #[arg(short = 'q', long = "query")]
    pub q: Option<String>,
    /// Stock status such as `critical` or `out_of_stock`
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// Brand name, or SIN_MARCA for products without a brand
    #[arg(long)]
    pub brand: Option<String>,
    /// Sort directives (`date_asc`, `stock_desc`, `value_desc`, ...), first is primary
    #[arg(long = "sort", action = clap::ArgAction::Append)]
    pub sort: Vec<String>,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Rows per page (defaults to the configured page size)
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
