//! Route resolution module
//!
//! Maps a decoded request path (API prefix already stripped) to a concrete
//! handler script on disk, in two phases: a direct file match, then a scan of
//! the cached route table for bracket-pattern routes.

pub mod guard;
pub mod matcher;
pub mod table;

use crate::engine::error::RouteError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use table::{RouteTable, HANDLER_EXTENSION};

/// Outcome of a successful resolution.
#[derive(Debug)]
pub struct Resolution {
    /// Guarded absolute path of the handler script.
    pub file_path: PathBuf,
    /// Parameters bound by bracket segments; empty for direct matches.
    pub params: HashMap<String, String>,
}

/// Resolves request paths against the handler directory.
///
/// The route table is built lazily and cached process-wide. Construction is
/// idempotent, so a concurrent first-build race at worst builds an equivalent
/// table twice; the cache only ever swaps the whole table reference.
pub struct Resolver {
    api_root: PathBuf,
    rebuild_on_miss: bool,
    table: RwLock<Option<Arc<RouteTable>>>,
}

impl Resolver {
    /// `rebuild_on_miss` tolerates newly added handler files without a
    /// restart (development); production keeps the first table for the
    /// process lifetime.
    pub fn new(api_root: PathBuf, rebuild_on_miss: bool) -> Self {
        Self {
            api_root,
            rebuild_on_miss,
            table: RwLock::new(None),
        }
    }

    pub fn api_root(&self) -> &Path {
        &self.api_root
    }

    /// Resolve a relative request path such as `users/123`.
    pub fn resolve(&self, relative_path: &str) -> Result<Resolution, RouteError> {
        // Phase 1: literal file match. The guard runs before the existence
        // check so traversal never reaches handler loading.
        let candidate = self
            .api_root
            .join(format!("{relative_path}.{HANDLER_EXTENSION}"));
        let guarded = guard::ensure_contained(&self.api_root, &candidate)?;
        if guarded.is_file() {
            return Ok(Resolution {
                file_path: guarded,
                params: HashMap::new(),
            });
        }

        // Phase 2: pattern match against the cached table.
        let segments: Vec<&str> = relative_path.split('/').filter(|s| !s.is_empty()).collect();

        let table = self.cached_table()?;
        if let Some((entry, params)) = table.resolve(&segments) {
            return Ok(Resolution {
                file_path: entry.file_path.clone(),
                params,
            });
        }

        if self.rebuild_on_miss {
            let table = self.rebuild_table()?;
            if let Some((entry, params)) = table.resolve(&segments) {
                return Ok(Resolution {
                    file_path: entry.file_path.clone(),
                    params,
                });
            }
        }

        Err(RouteError::RouteNotFound)
    }

    /// Drop the cached table so the next resolution rebuilds it.
    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.table.write() {
            *slot = None;
        }
    }

    fn cached_table(&self) -> Result<Arc<RouteTable>, RouteError> {
        let cached = self
            .table
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().map(Arc::clone));
        match cached {
            Some(table) => Ok(table),
            None => self.rebuild_table(),
        }
    }

    fn rebuild_table(&self) -> Result<Arc<RouteTable>, RouteError> {
        let table = Arc::new(
            RouteTable::build(&self.api_root).map_err(|_| RouteError::RouteNotFound)?,
        );
        if let Ok(mut slot) = self.table.write() {
            *slot = Some(Arc::clone(&table));
        }
        Ok(table)
    }
}
