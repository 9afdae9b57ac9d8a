//! In-memory persistence boundary for tests/dev.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::anyhow;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::Participant;

/// Committed state shared by every operation touching one module's data.
///
/// Intended for tests/dev. Not optimized for performance. Writes only happen
/// through an [`InMemoryParticipant`] (`commit` or `apply_pending`).
#[derive(Debug)]
pub struct InMemoryTable<K, V> {
    rows: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for InMemoryTable<K, V> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> InMemoryTable<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.rows.read().ok()?.get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.rows.read().map(|rows| rows.contains_key(key)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of committed rows matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&K, &V) -> bool) -> Vec<V> {
        self.rows
            .read()
            .map(|rows| {
                rows.iter()
                    .filter(|(k, v)| predicate(k, v))
                    .map(|(_, v)| v.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn apply(&self, changes: Vec<Change<K, V>>) -> anyhow::Result<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| anyhow!("in-memory table lock poisoned"))?;
        for change in changes {
            match change {
                Change::Upsert(key, value) => {
                    rows.insert(key, value);
                }
                Change::Remove(key) => {
                    rows.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Change<K, V> {
    Upsert(K, V),
    Remove(K),
}

/// Stages writes against an [`InMemoryTable`] and applies them on commit.
///
/// Reads through [`InMemoryParticipant::get`] see staged changes first
/// (read-your-writes within the operation).
#[derive(Debug)]
pub struct InMemoryParticipant<K, V> {
    name: String,
    table: Arc<InMemoryTable<K, V>>,
    pending: Mutex<Vec<Change<K, V>>>,
}

impl<K, V> InMemoryParticipant<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: impl Into<String>, table: Arc<InMemoryTable<K, V>>) -> Self {
        Self {
            name: name.into(),
            table,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn table(&self) -> &Arc<InMemoryTable<K, V>> {
        &self.table
    }

    pub fn stage_upsert(&self, key: K, value: V) -> anyhow::Result<()> {
        self.stage(Change::Upsert(key, value))
    }

    pub fn stage_remove(&self, key: K) -> anyhow::Result<()> {
        self.stage(Change::Remove(key))
    }

    fn stage(&self, change: Change<K, V>) -> anyhow::Result<()> {
        self.pending
            .lock()
            .map_err(|_| anyhow!("{}: pending changes lock poisoned", self.name))?
            .push(change);
        Ok(())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Latest value for `key`: the last staged change wins, otherwise committed state.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Ok(pending) = self.pending.lock() {
            for change in pending.iter().rev() {
                match change {
                    Change::Upsert(k, v) if k == key => return Some(v.clone()),
                    Change::Remove(k) if k == key => return None,
                    _ => {}
                }
            }
        }
        self.table.get(key)
    }

    /// Apply and clear the staged changes without consulting a cancellation token.
    ///
    /// For participants that group several tables and check cancellation once
    /// for all of them. Applying nothing is a no-op.
    pub fn apply_pending(&self) -> anyhow::Result<()> {
        let changes = {
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| anyhow!("{}: pending changes lock poisoned", self.name))?;
            std::mem::take(&mut *pending)
        };

        if changes.is_empty() {
            return Ok(());
        }

        tracing::trace!(participant = %self.name, changes = changes.len(), "applying staged changes");
        self.table.apply(changes)
    }

    /// Staged upserts (in staging order) matching `predicate`.
    pub fn staged(&self, predicate: impl Fn(&K, &V) -> bool) -> Vec<V> {
        self.pending
            .lock()
            .map(|pending| {
                pending
                    .iter()
                    .filter_map(|change| match change {
                        Change::Upsert(k, v) if predicate(k, v) => Some(v.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl<K, V> Participant for InMemoryParticipant<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn has_pending_changes(&self) -> bool {
        self.pending_len() > 0
    }

    async fn commit(&self, cancel: &CancellationToken) -> anyhow::Result<()> {
        if cancel.is_cancelled() {
            anyhow::bail!("{}: cancelled before commit; nothing applied", self.name);
        }

        self.apply_pending()
    }
}
