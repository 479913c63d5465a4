use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use crate::api::synthetic::{KpiJitter, SyntheticSource};
use crate::config::ServerConfig;
use crate::data::Table;
use crate::data::loader;

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

/// The backing files the server knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// Sales-only schema served under `/api`.
    Sales,
    /// Enhanced business schema served under `/api/google` and `/api/sap`.
    Business,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Sales => "sales",
            SourceId::Business => "business",
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset store – read-only, process-wide table cache
// ---------------------------------------------------------------------------

struct CachedTable {
    modified: SystemTime,
    table: Arc<Table>,
}

/// Loads tables by source and caches them until the backing file's
/// modification time changes.
///
/// Cached tables are shared as `Arc<Table>` and never mutated. A failed
/// load yields an empty table so every endpoint degrades to an empty
/// result.
pub struct DatasetStore {
    paths: HashMap<SourceId, PathBuf>,
    cache_enabled: bool,
    cache: RwLock<HashMap<SourceId, CachedTable>>,
}

impl DatasetStore {
    pub fn new<I>(sources: I, cache_enabled: bool) -> Self
    where
        I: IntoIterator<Item = (SourceId, PathBuf)>,
    {
        Self {
            paths: sources.into_iter().collect(),
            cache_enabled,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The current table for `source`, empty if it cannot be loaded.
    pub fn table(&self, source: SourceId) -> Arc<Table> {
        let Some(path) = self.paths.get(&source) else {
            log::warn!("no backing file configured for '{}'", source.as_str());
            return Arc::new(Table::default());
        };

        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();

        if self.cache_enabled {
            if let Some(hit) = self.cached(source, modified) {
                return hit;
            }
        }

        match loader::load(source.as_str(), path) {
            Ok(table) => {
                let table = Arc::new(table);
                if let (true, Some(modified)) = (self.cache_enabled, modified) {
                    if let Ok(mut cache) = self.cache.write() {
                        cache.insert(
                            source,
                            CachedTable {
                                modified,
                                table: Arc::clone(&table),
                            },
                        );
                    }
                }
                table
            }
            Err(err) => {
                log::warn!("{err}; serving empty result");
                if let Ok(mut cache) = self.cache.write() {
                    cache.remove(&source);
                }
                Arc::new(Table::default())
            }
        }
    }

    fn cached(&self, source: SourceId, modified: Option<SystemTime>) -> Option<Arc<Table>> {
        let modified = modified?;
        let cache = self.cache.read().ok()?;
        cache
            .get(&source)
            .filter(|entry| entry.modified == modified)
            .map(|entry| Arc::clone(&entry.table))
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Everything a request handler needs, shared across requests.
pub struct AppState {
    pub store: DatasetStore,
    /// Optional simulated variation applied to KPI totals.
    pub jitter: KpiJitter,
    /// Source of explicitly labelled placeholder scores.
    pub synthetic: SyntheticSource,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            store: DatasetStore::new(config.sources.iter().cloned(), config.cache),
            jitter: KpiJitter::new(config.kpi_jitter, config.seed),
            synthetic: SyntheticSource::new(config.seed.map(|s| s.wrapping_add(1))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_degrades_to_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new([(SourceId::Sales, dir.path().join("absent.csv"))], true);
        assert!(store.table(SourceId::Sales).is_empty());
        assert!(store.table(SourceId::Business).is_empty());
    }

    #[test]
    fn cache_returns_shared_table_until_file_changes() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "region,revenue\nEast,100").unwrap();
        file.flush().unwrap();

        let store = DatasetStore::new([(SourceId::Sales, file.path().to_path_buf())], true);
        let first = store.table(SourceId::Sales);
        let second = store.table(SourceId::Sales);
        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn disabled_cache_reloads() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "region,revenue\nEast,100").unwrap();
        file.flush().unwrap();

        let store = DatasetStore::new([(SourceId::Sales, file.path().to_path_buf())], false);
        let first = store.table(SourceId::Sales);
        let second = store.table(SourceId::Sales);
        assert_eq!(first, second);
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
