use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

/// Concurrent get-or-populate map.
///
/// Each key owns a [`OnceCell`]. The first caller to reach an empty cell runs
/// its initializer; concurrent callers for the same key wait for it and share
/// the result instead of starting their own. A failed initializer leaves the
/// cell empty, and the next waiter in line runs its own. The last caller to
/// fail drops the empty cell so misses do not accumulate.
pub struct SingleFlight<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// The populated value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let cells = self.cells.lock().expect("lock poisoned");
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Return the value for `key`, running `init` if no value exists yet and
    /// no other caller is already populating it.
    pub async fn get_or_try_init<F, Fut, E>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = {
            let mut cells = self.cells.lock().expect("lock poisoned");
            Arc::clone(cells.entry(key.clone()).or_default())
        };
        match cell.get_or_try_init(init).await {
            Ok(value) => Ok(value.clone()),
            Err(err) => {
                self.discard_if_idle(&key, &cell);
                Err(err)
            }
        }
    }

    // The map and `cell` hold the only references when no one else waits.
    fn discard_if_idle(&self, key: &K, cell: &Arc<OnceCell<V>>) {
        let mut cells = self.cells.lock().expect("lock poisoned");
        let idle = cells.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, cell) && !current.initialized() && Arc::strong_count(cell) == 2
        });
        if idle {
            cells.remove(key);
        }
    }

    /// Store `value` for `key` unless one is already present. Returns `true`
    /// if `value` was stored.
    pub fn insert(&self, key: K, value: V) -> bool {
        let cell = {
            let mut cells = self.cells.lock().expect("lock poisoned");
            Arc::clone(cells.entry(key).or_default())
        };
        cell.set(value).is_ok()
    }

    /// Forget `key`. Callers already waiting on it keep their shared result.
    pub fn remove(&self, key: &K) {
        self.cells.lock().expect("lock poisoned").remove(key);
    }

    /// Number of populated keys.
    pub fn len(&self) -> usize {
        let cells = self.cells.lock().expect("lock poisoned");
        cells.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn cells_len(&self) -> usize {
        self.cells.lock().expect("lock poisoned").len()
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for SingleFlight<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.cells.lock().map(|cells| cells.len()).unwrap_or(0);
        f.debug_struct("SingleFlight").field("keys", &keys).finish()
    }
}
