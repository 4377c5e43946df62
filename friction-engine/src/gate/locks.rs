//! Per-file async locks for remedies that edit overlapping files.
//!
//! Locks are always taken in sorted path order, so two remedies contending
//! for the same files cannot deadlock. A path's entry lives only while some
//! remedy holds or waits on it.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as FileMutex, OwnedMutexGuard};

type Table = Arc<Mutex<HashMap<String, Arc<FileMutex<()>>>>>;

/// Guards held for the duration of one remedy execution.
pub struct FileGuards {
    guards: Vec<OwnedMutexGuard<()>>,
    paths: Vec<String>,
    table: Table,
}

impl Drop for FileGuards {
    fn drop(&mut self) {
        self.guards.clear();
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        for path in &self.paths {
            if table.get(path).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                table.remove(path);
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct FileLockTable {
    locks: Table,
}

impl FileLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire every file in `paths`, waiting on any already held.
    pub async fn acquire(&self, paths: &[String]) -> FileGuards {
        let ordered: BTreeSet<String> = paths
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !p.is_empty())
            .collect();

        let handles: Vec<Arc<FileMutex<()>>> = {
            let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            ordered
                .iter()
                .map(|path| Arc::clone(table.entry(path.clone()).or_default()))
                .collect()
        };

        let mut held = FileGuards {
            guards: Vec::with_capacity(handles.len()),
            paths: ordered.into_iter().collect(),
            table: Arc::clone(&self.locks),
        };
        for handle in handles {
            held.guards.push(handle.lock_owned().await);
        }
        held
    }

    /// Number of paths currently tracked.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    trimmed.strip_prefix("./").unwrap_or(trimmed).to_string()
}
