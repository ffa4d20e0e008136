//! Session-aware entry points over the analysis core.
//!
//! [`InventoryEngine`] resolves a session from the injected
//! [`SessionStore`], makes sure its analysis is built and hands the table to
//! the query and aggregation functions. Independent engines over independent
//! stores share nothing.

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::{
    aggregate::{self, AbcSummary, Dimension, GroupSummary, Kpis, StatusShare},
    analysis::AnalysisTable,
    config::EngineConfig,
    error::{EngineError, EngineResult},
    query::{self, PageRequest, PageResult, ProductView, SearchFilters, SortKey},
    rows::RowTable,
    session::{SessionId, SessionMetadata, SessionStore},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub session_id: SessionId,
    pub data_loaded: bool,
    pub total_products: usize,
}

/// Every dashboard view in one response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullAnalysis {
    pub kpis: Kpis,
    pub stock_status: Vec<StatusShare>,
    pub abc: AbcSummary,
    /// `None` when the dataset has no category column.
    pub categories: Option<Vec<GroupSummary>>,
    /// `None` when the dataset has no brand column.
    pub brands: Option<Vec<GroupSummary>>,
}

#[derive(Debug, Clone)]
pub struct InventoryEngine {
    store: Arc<SessionStore>,
    config: EngineConfig,
}

impl InventoryEngine {
    pub fn new(store: Arc<SessionStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Engine over a fresh, private store.
    pub fn standalone(config: EngineConfig) -> Self {
        Self::new(Arc::new(SessionStore::new()), config)
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replaces the session's row table. The previous analysis is discarded.
    pub fn ingest(
        &self,
        session: &SessionId,
        table: impl Into<Arc<RowTable>>,
        source_name: impl Into<String>,
    ) -> EngineResult<()> {
        self.store.session(session)?.ingest(table, source_name)?;
        Ok(())
    }

    /// The session's analysis, built on first use. `None` before any ingest.
    pub fn get_analysis(&self, session: &SessionId) -> EngineResult<Option<Arc<AnalysisTable>>> {
        self.store
            .session(session)?
            .get_or_build(&self.config.columns)
    }

    fn analysis(&self, session: &SessionId) -> EngineResult<Arc<AnalysisTable>> {
        self.get_analysis(session)?
            .ok_or_else(|| EngineError::NoData {
                session: session.clone(),
            })
    }

    pub fn search(
        &self,
        session: &SessionId,
        filters: &SearchFilters,
        sort: &[SortKey],
        page: usize,
        limit: Option<usize>,
    ) -> EngineResult<PageResult> {
        let table = self.analysis(session)?;
        let request = PageRequest::new(page, limit.unwrap_or(self.config.limits.page_size));
        query::search(&table, filters, sort, request)
    }

    pub fn kpis(&self, session: &SessionId) -> EngineResult<Kpis> {
        let table = self.analysis(session)?;
        Ok(aggregate::compute_kpis(&table))
    }

    pub fn stock_status_distribution(&self, session: &SessionId) -> EngineResult<Vec<StatusShare>> {
        let table = self.analysis(session)?;
        Ok(aggregate::stock_status_distribution(&table))
    }

    pub fn abc_summary(&self, session: &SessionId) -> EngineResult<AbcSummary> {
        let table = self.analysis(session)?;
        Ok(aggregate::abc_summary(&table))
    }

    /// The largest groups of `dimension`, up to the configured group limit.
    pub fn group_by(
        &self,
        session: &SessionId,
        dimension: Dimension,
    ) -> EngineResult<Vec<GroupSummary>> {
        let table = self.analysis(session)?;
        debug!("Grouping session '{session}' by {dimension}");
        aggregate::group_by(&table, dimension, self.config.limits.top_groups)
    }

    pub fn alerts(&self, session: &SessionId) -> EngineResult<Vec<ProductView>> {
        let table = self.analysis(session)?;
        Ok(aggregate::alerts(&table, self.config.limits.alerts))
    }

    pub fn top_products(&self, session: &SessionId) -> EngineResult<Vec<ProductView>> {
        let table = self.analysis(session)?;
        Ok(aggregate::top_products(&table, self.config.limits.top_products))
    }

    pub fn unique_brands(
        &self,
        session: &SessionId,
        category: Option<&str>,
    ) -> EngineResult<Vec<String>> {
        let table = self.analysis(session)?;
        aggregate::unique_brands(&table, category)
    }

    /// Available even before an ingest; reports the placeholder source then.
    pub fn metadata(&self, session: &SessionId) -> EngineResult<SessionMetadata> {
        self.store.session(session)?.metadata()
    }

    /// Never fails on an empty session; only a poisoned lock is an error.
    pub fn health(&self, session: &SessionId) -> EngineResult<Health> {
        let total_products = self
            .store
            .session(session)?
            .row_table()?
            .map(|table| table.len());
        Ok(Health {
            session_id: session.clone(),
            data_loaded: total_products.is_some(),
            total_products: total_products.unwrap_or_default(),
        })
    }

    pub fn full_analysis(&self, session: &SessionId) -> EngineResult<FullAnalysis> {
        let table = self.analysis(session)?;
        let top = self.config.limits.top_groups;
        Ok(FullAnalysis {
            kpis: aggregate::compute_kpis(&table),
            stock_status: aggregate::stock_status_distribution(&table),
            abc: aggregate::abc_summary(&table),
            categories: optional_view(aggregate::group_by(&table, Dimension::Category, top))?,
            brands: optional_view(aggregate::group_by(&table, Dimension::Brand, top))?,
        })
    }
}

/// Turns an unavailable view into `None`; other errors still propagate.
fn optional_view<T>(result: EngineResult<T>) -> EngineResult<Option<T>> {
    match result {
        Ok(view) => Ok(Some(view)),
        Err(EngineError::FeatureUnavailable { column }) => {
            debug!("Skipping view over missing column '{column}'");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn headers() -> Vec<String> {
        let mut headers = (0..18).map(|i| format!("c{i}")).collect::<Vec<_>>();
        headers[0] = "ID".into();
        headers[1] = "SKU".into();
        headers[2] = "Producto".into();
        headers[3] = "Marca".into();
        headers
    }

    fn row(id: i64, brand: &str, stock: i64, value: f64) -> Vec<Value> {
        let mut row = vec![Value::Null; 18];
        row[0] = Value::Integer(id);
        row[1] = Value::from(format!("SKU-{id}").as_str());
        row[2] = Value::from("Item");
        row[3] = Value::from_raw(brand);
        row[14] = Value::Integer(stock);
        row[16] = Value::Float(value);
        row
    }

    #[test]
    fn queries_before_ingest_report_no_data() {
        let engine = InventoryEngine::standalone(EngineConfig::default());
        let id = SessionId::from("fresh");
        let err = engine.kpis(&id).unwrap_err();
        assert!(err.is_no_data());
        assert!(engine.get_analysis(&id).unwrap().is_none());

        let health = engine.health(&id).unwrap();
        assert!(!health.data_loaded);
        assert_eq!(health.total_products, 0);
    }

    #[test]
    fn full_analysis_skips_views_over_missing_columns() {
        let engine = InventoryEngine::standalone(EngineConfig::default());
        let id = SessionId::from("s");
        let table = RowTable::new(headers(), vec![row(1, "ACME", 3, 10.0), row(2, "", 0, 5.0)]);
        engine.ingest(&id, table, "inventario").unwrap();

        let bundle = engine.full_analysis(&id).unwrap();
        assert!(bundle.categories.is_none());
        let brands = bundle.brands.unwrap();
        assert_eq!(brands.len(), 2);
        assert_eq!(bundle.kpis.total_skus, 2);

        let err = engine.group_by(&id, Dimension::Category).unwrap_err();
        assert!(err.is_feature_unavailable());
    }

    #[test]
    fn sessions_in_one_store_are_isolated() {
        let engine = InventoryEngine::standalone(EngineConfig::default());
        let left = SessionId::from("left");
        let right = SessionId::from("right");
        engine
            .ingest(&left, RowTable::new(headers(), vec![row(1, "A", 1, 1.0)]), "l")
            .unwrap();

        assert_eq!(engine.health(&left).unwrap().total_products, 1);
        assert!(engine.kpis(&right).unwrap_err().is_no_data());
        assert_eq!(engine.metadata(&left).unwrap().source_name, "l");
    }
}
