//! Session-scoped datasets.
//!
//! The engine itself is stateless. Callers that keep one dataset per user
//! session store it behind a [`SessionStore`] and run batches through a
//! [`SessionRunner`], which serializes `apply` calls per session and commits
//! the new frame only when the batch completes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use polars::prelude::DataFrame;
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::RecommendationEngine;
use crate::error::EngineError;
use crate::types::ExecutionResult;

/// Errors from session-level operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Storage for one dataset per session id.
pub trait SessionStore: Send + Sync {
    fn get(&self, id: &str) -> Option<DataFrame>;
    fn put(&self, id: &str, df: DataFrame);
    fn remove(&self, id: &str) -> Option<DataFrame>;
}

/// Process-local [`SessionStore`].
#[derive(Default)]
pub struct InMemorySessionStore {
    frames: RwLock<HashMap<String, DataFrame>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.read().is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &str) -> Option<DataFrame> {
        self.frames.read().get(id).cloned()
    }

    fn put(&self, id: &str, df: DataFrame) {
        self.frames.write().insert(id.to_string(), df);
    }

    fn remove(&self, id: &str) -> Option<DataFrame> {
        self.frames.write().remove(id)
    }
}

/// Runs recommendation batches against stored session datasets.
pub struct SessionRunner<S: SessionStore> {
    store: S,
    engine: RecommendationEngine,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

static_assertions::assert_impl_all!(InMemorySessionStore: Send, Sync);
static_assertions::assert_impl_all!(SessionRunner<InMemorySessionStore>: Send, Sync);

impl<S: SessionStore> SessionRunner<S> {
    pub fn new(store: S, engine: RecommendationEngine) -> Self {
        Self {
            store,
            engine,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    /// Store `df` as the current dataset of session `id`.
    pub fn open(&self, id: &str, df: DataFrame) {
        let lock = self.lock_for(id);
        let _guard = lock.lock();
        debug!("Opening session '{}' with {} rows", id, df.height());
        self.store.put(id, df);
    }

    /// Drop session `id` and its dataset.
    ///
    /// The per-id lock is discarded only when no other caller holds it, so
    /// a batch waiting on it and any later batch for the same id still share
    /// one lock.
    pub fn close(&self, id: &str) -> Option<DataFrame> {
        let lock = self.lock_for(id);
        let removed = {
            let _guard = lock.lock();
            self.store.remove(id)
        };
        drop(lock);

        let mut locks = self.locks.lock();
        if locks.get(id).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(id);
        }
        removed
    }

    /// Apply a batch to the dataset of session `id`.
    ///
    /// Concurrent calls for the same id run one after another. The stored
    /// frame is replaced only if the batch returns normally; an aborted
    /// batch leaves it untouched.
    pub fn apply<T: AsRef<str>>(
        &self,
        id: &str,
        recommendations: &[T],
    ) -> Result<ExecutionResult, SessionError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock();

        let df = self
            .store
            .get(id)
            .ok_or_else(|| SessionError::SessionNotFound(id.to_string()))?;
        let (out, result) = self.engine.apply(&df, recommendations)?;
        self.store.put(id, out);

        info!(
            "Session '{}': {} applied, {} skipped, {} failed",
            id,
            result.applied.len(),
            result.skipped.len(),
            result.errors.len()
        );
        Ok(result)
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.lock().entry(id.to_string()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    fn runner() -> SessionRunner<InMemorySessionStore> {
        SessionRunner::new(InMemorySessionStore::new(), RecommendationEngine::new())
    }

    #[test]
    fn test_apply_commits_result() {
        let runner = runner();
        runner.open("s1", df!("A" => [1i64, 2, 3]).unwrap());

        let result = runner.apply("s1", &["rename column 'A' to 'B'"]).unwrap();
        assert_eq!(result.applied.len(), 1);

        let stored = runner.store().get("s1").unwrap();
        assert!(stored.column("B").is_ok());
        assert!(stored.column("A").is_err());
    }

    #[test]
    fn test_unknown_session() {
        let err = runner().apply("missing", &["drop missing values"]).unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound(ref id) if id == "missing"));
        assert_eq!(err.to_string(), "Session 'missing' not found");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let runner = runner();
        runner.open("a", df!("x" => [1i64, 1, 2]).unwrap());
        runner.open("b", df!("x" => [1i64, 1, 2]).unwrap());

        runner.apply("a", &["remove duplicate rows"]).unwrap();

        assert_eq!(runner.store().get("a").unwrap().height(), 2);
        assert_eq!(runner.store().get("b").unwrap().height(), 3);
    }

    #[test]
    fn test_concurrent_batches_serialize() {
        let runner = Arc::new(runner());
        runner.open("s", df!("v" => [1i64, 2, 3]).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let runner = Arc::clone(&runner);
                thread::spawn(move || {
                    runner.apply("s", &["create new feature 'v' as v + 1"]).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // No batch may read a frame another batch has already replaced.
        let stored = runner.store().get("s").unwrap();
        let values: Vec<Option<i64>> = stored.column("v").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(5), Some(6), Some(7)]);
    }

    #[test]
    fn test_close_removes_dataset() {
        let runner = runner();
        runner.open("s", df!("x" => [1i64]).unwrap());
        assert!(runner.close("s").is_some());
        assert!(runner.store().is_empty());
        assert!(runner.locks.lock().is_empty());
    }

    #[test]
    fn test_close_keeps_lock_while_held() {
        let runner = runner();
        runner.open("s", df!("x" => [1i64]).unwrap());

        // A batch that already cloned the lock and is waiting on it.
        let waiting = runner.lock_for("s");
        runner.close("s");
        runner.open("s", df!("x" => [2i64]).unwrap());

        assert!(Arc::ptr_eq(&waiting, &runner.lock_for("s")));

        drop(waiting);
        runner.close("s");
        assert!(!runner.locks.lock().contains_key("s"));
    }

    #[test]
    fn test_reopened_session_serializes_batches() {
        let runner = Arc::new(runner());
        runner.open("s", df!("v" => [0i64]).unwrap());
        runner.apply("s", &["create new feature 'v' as v + 100"]).unwrap();
        runner.close("s");
        runner.open("s", df!("v" => [1i64, 2, 3]).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let runner = Arc::clone(&runner);
                thread::spawn(move || {
                    runner.apply("s", &["create new feature 'v' as v + 1"]).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = runner.store().get("s").unwrap();
        let values: Vec<Option<i64>> = stored.column("v").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(5), Some(6), Some(7)]);
    }
}
