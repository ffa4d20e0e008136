//! Per-session state and the process-wide session store.
//!
//! Each [`Session`] walks a small state machine:
//!
//! - `Empty`: nothing ingested yet; queries report no data.
//! - `Loaded`: a row table is present, its analysis not built yet.
//! - `Analyzed`: the analysis for the current row table is cached.
//!
//! [`Session::ingest`] moves any state to `Loaded` under the state write lock,
//! so a new row table and the cleared cache become visible together.
//! [`Session::get_or_build`] moves `Loaded` to `Analyzed`; concurrent callers
//! serialize on a per-session build lock and re-check the state after
//! acquiring it, so one generation of a row table is analyzed at most once.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use chrono::{DateTime, Local};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    analysis::{self, AnalysisTable},
    config::ColumnLayout,
    error::{EngineError, EngineResult},
    rows::RowTable,
};

/// Placeholder source name reported before the first ingestion.
pub const NO_SOURCE: &str = "Sin datos";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Issues a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetadata {
    pub source_name: String,
    pub ingested_at: Option<DateTime<Local>>,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            source_name: NO_SOURCE.to_string(),
            ingested_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Empty,
    Loaded,
    Analyzed,
}

#[derive(Debug)]
enum SessionState {
    Empty,
    Loaded {
        table: Arc<RowTable>,
    },
    Analyzed {
        table: Arc<RowTable>,
        analysis: Arc<AnalysisTable>,
    },
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    metadata: SessionMetadata,
    /// Bumped by every ingestion; identifies the current row table.
    generation: u64,
}

enum Snapshot {
    Empty,
    Loaded(Arc<RowTable>, u64),
    Analyzed(Arc<AnalysisTable>),
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    inner: RwLock<SessionInner>,
    build_lock: Mutex<()>,
    builds: AtomicU64,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            inner: RwLock::new(SessionInner {
                state: SessionState::Empty,
                metadata: SessionMetadata::default(),
                generation: 0,
            }),
            build_lock: Mutex::new(()),
            builds: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, SessionInner>> {
        self.inner.read().map_err(|_| EngineError::StatePoisoned)
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, SessionInner>> {
        self.inner.write().map_err(|_| EngineError::StatePoisoned)
    }

    fn snapshot(&self) -> EngineResult<Snapshot> {
        let inner = self.read()?;
        Ok(match &inner.state {
            SessionState::Empty => Snapshot::Empty,
            SessionState::Loaded { table } => Snapshot::Loaded(Arc::clone(table), inner.generation),
            SessionState::Analyzed { analysis, .. } => Snapshot::Analyzed(Arc::clone(analysis)),
        })
    }

    /// Replaces the row table, dropping any cached analysis in the same step.
    /// Returns the new generation number.
    pub fn ingest(
        &self,
        table: impl Into<Arc<RowTable>>,
        source_name: impl Into<String>,
    ) -> EngineResult<u64> {
        let table = table.into();
        let rows = table.len();
        let columns = table.column_count();
        let source_name = source_name.into();
        let mut inner = self.write()?;
        inner.generation += 1;
        inner.state = SessionState::Loaded { table };
        inner.metadata = SessionMetadata {
            source_name,
            ingested_at: Some(Local::now()),
        };
        info!(
            "Session '{}' ingested {} row(s) across {} column(s) from '{}' (generation {})",
            self.id, rows, columns, inner.metadata.source_name, inner.generation
        );
        Ok(inner.generation)
    }

    pub fn phase(&self) -> EngineResult<SessionPhase> {
        Ok(match self.read()?.state {
            SessionState::Empty => SessionPhase::Empty,
            SessionState::Loaded { .. } => SessionPhase::Loaded,
            SessionState::Analyzed { .. } => SessionPhase::Analyzed,
        })
    }

    pub fn generation(&self) -> EngineResult<u64> {
        Ok(self.read()?.generation)
    }

    pub fn metadata(&self) -> EngineResult<SessionMetadata> {
        Ok(self.read()?.metadata.clone())
    }

    pub fn row_table(&self) -> EngineResult<Option<Arc<RowTable>>> {
        Ok(match &self.read()?.state {
            SessionState::Empty => None,
            SessionState::Loaded { table } | SessionState::Analyzed { table, .. } => {
                Some(Arc::clone(table))
            }
        })
    }

    /// Number of analysis builds this session has run.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// Returns the cached analysis, building it first when the session is
    /// `Loaded`. `None` means nothing has been ingested.
    pub fn get_or_build(&self, layout: &ColumnLayout) -> EngineResult<Option<Arc<AnalysisTable>>> {
        match self.snapshot()? {
            Snapshot::Empty => return Ok(None),
            Snapshot::Analyzed(analysis) => {
                debug!("Session '{}' served analysis from cache", self.id);
                return Ok(Some(analysis));
            }
            Snapshot::Loaded(..) => {}
        }

        // The build lock protects no data, only the right to build.
        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        loop {
            let (table, generation) = match self.snapshot()? {
                Snapshot::Empty => return Ok(None),
                Snapshot::Analyzed(analysis) => return Ok(Some(analysis)),
                Snapshot::Loaded(table, generation) => (table, generation),
            };

            let started = Instant::now();
            let analysis = Arc::new(analysis::build(Arc::clone(&table), layout));
            self.builds.fetch_add(1, Ordering::Relaxed);

            let mut inner = self.write()?;
            if inner.generation == generation
                && matches!(inner.state, SessionState::Loaded { .. })
            {
                inner.state = SessionState::Analyzed {
                    table,
                    analysis: Arc::clone(&analysis),
                };
                info!(
                    "Session '{}' built analysis for {} row(s) (generation {}) in {:?}",
                    self.id,
                    analysis.len(),
                    generation,
                    started.elapsed()
                );
                return Ok(Some(analysis));
            }
            debug!(
                "Session '{}' discarded analysis for superseded generation {}",
                self.id, generation
            );
        }
    }
}

/// Owner of every session in the process. Sessions are created on first touch
/// and live until the store is dropped.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a session, creating it when the id is new.
    pub fn session(&self, id: &SessionId) -> EngineResult<Arc<Session>> {
        if let Some(existing) = self.get(id)? {
            return Ok(existing);
        }
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| EngineError::StatePoisoned)?;
        let session = sessions.entry(id.clone()).or_insert_with(|| {
            debug!("Created session '{id}'");
            Arc::new(Session::new(id.clone()))
        });
        Ok(Arc::clone(session))
    }

    /// Looks up a session without creating it.
    pub fn get(&self, id: &SessionId) -> EngineResult<Option<Arc<Session>>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| EngineError::StatePoisoned)?;
        Ok(sessions.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
