//! Time-bounded caches for the two blocking inputs: the dataset file and
//! geocoding lookups.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::CongestionError;

/// Map from key to (value, inserted-at). An entry older than the TTL is
/// dropped when it is looked up.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (V, Instant)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let fresh = match self.entries.get(key) {
            Some((_, inserted)) => now.saturating_duration_since(*inserted) < self.ttl,
            None => return None,
        };

        if fresh {
            self.entries.get(key).map(|(value, _)| value.clone())
        } else {
            self.entries.remove(key);
            None
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        self.purge_expired(now);
        self.entries.insert(key, (value, now));
    }

    pub fn purge_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (_, inserted)| now.saturating_duration_since(*inserted) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identifies one version of a dataset file. Rewriting the file changes the
/// modification time and therefore the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetKey {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl DatasetKey {
    pub fn for_path(path: &Path) -> Result<Self, CongestionError> {
        let origin = path.display().to_string();
        let path = path
            .canonicalize()
            .map_err(|e| CongestionError::unavailable(&origin, e))?;
        let modified = path
            .metadata()
            .map_err(|e| CongestionError::unavailable(&origin, e))?
            .modified()
            .ok();
        Ok(Self { path, modified })
    }
}

/// Loads each dataset version once per TTL window and hands out shared handles.
#[derive(Debug)]
pub struct DatasetCache {
    entries: TtlCache<DatasetKey, Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: TtlCache::new(ttl),
        }
    }

    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<Dataset>, CongestionError> {
        let key = DatasetKey::for_path(path)?;
        if let Some(dataset) = self.entries.get(&key) {
            debug!(path = %path.display(), "Dataset cache hit");
            return Ok(dataset);
        }

        let dataset = Arc::new(Dataset::load(path)?);
        self.entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_entry_fresh_within_ttl() {
        let start = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.insert_at("k", 1, start);
        assert_eq!(cache.get_at(&"k", start + Duration::from_secs(9)), Some(1));
    }

    #[test]
    fn test_entry_expires_at_lookup() {
        let start = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.insert_at("k", 1, start);
        assert_eq!(cache.get_at(&"k", start + Duration::from_secs(10)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_purges_stale_entries() {
        let start = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(1));
        cache.insert_at("old", 1, start);
        cache.insert_at("new", 2, start + Duration::from_secs(5));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_dataset_cache_returns_shared_handle() {
        let path = temp_path("subway_congestion_cache_test.csv");
        fs::write(&path, "호선,출발역,요일구분,상하구분,5시30분\n2,A,평일,상선,10\n").unwrap();

        let mut cache = DatasetCache::new(Duration::from_secs(60));
        let first = cache.get_or_load(Path::new(&path)).unwrap();
        let second = cache.get_or_load(Path::new(&path)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_dataset_cache_reloads_rewritten_file() {
        let path = temp_path("subway_congestion_cache_rewrite_test.csv");
        fs::write(&path, "호선,출발역,요일구분,상하구분,5시30분\n2,A,평일,상선,10\n").unwrap();

        let mut cache = DatasetCache::new(Duration::from_secs(60));
        let before = cache.get_or_load(Path::new(&path)).unwrap();

        fs::write(&path, "호선,출발역,요일구분,상하구분,5시30분\n2,A,평일,상선,99\n").unwrap();
        // Same-second rewrites can keep the old mtime on coarse filesystems.
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        let after = cache.get_or_load(Path::new(&path)).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.records()[0].values, vec![Some(10.0)]);
        assert_eq!(after.records()[0].values, vec![Some(99.0)]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_dataset_cache_reloads_after_ttl() {
        let path = temp_path("subway_congestion_cache_ttl_test.csv");
        fs::write(&path, "호선,출발역,요일구분,상하구분,5시30분\n2,A,평일,상선,10\n").unwrap();

        let mut cache = DatasetCache::new(Duration::ZERO);
        let first = cache.get_or_load(Path::new(&path)).unwrap();
        let second = cache.get_or_load(Path::new(&path)).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.records(), second.records());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_dataset_cache_missing_file() {
        let mut cache = DatasetCache::new(Duration::from_secs(60));
        let err = cache
            .get_or_load(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, CongestionError::DataUnavailable { .. }));
    }
}
