// src/consensus/store.rs
//
// Report store seam. Triangulation and validation read a candidate set and
// then write membership/confidence flags; every such read-modify-write runs
// inside `ReportStore::transaction`, which serialises writers and discards
// the changes of a failed closure.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geo::{haversine_distance, GeoPoint};
use crate::detection::Report;
use crate::error::StoreError;

/// The working set a transaction operates on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportSet {
    reports: BTreeMap<Uuid, Report>,
}

impl ReportSet {
    pub fn get(&self, id: Uuid) -> Option<&Report> {
        self.reports.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Report> {
        self.reports.get_mut(&id)
    }

    /// Fetch a report or fail with [`StoreError::NotFound`]
    pub fn require(&self, id: Uuid) -> Result<&Report, StoreError> {
        self.get(id).ok_or(StoreError::NotFound(id))
    }

    pub fn require_mut(&mut self, id: Uuid) -> Result<&mut Report, StoreError> {
        self.get_mut(id).ok_or(StoreError::NotFound(id))
    }

    pub fn insert(&mut self, report: Report) -> Uuid {
        let id = report.id;
        self.reports.insert(id, report);
        id
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Report> {
        self.reports.values()
    }

    /// Located reports within `radius_m` of `center` that pass `filter`,
    /// nearest first, at most `limit` of them.
    pub fn nearby<F>(&self, center: &GeoPoint, radius_m: f64, limit: usize, filter: F) -> Vec<(f64, &Report)>
    where
        F: Fn(&Report) -> bool,
    {
        let mut hits: Vec<(f64, &Report)> = self
            .reports
            .values()
            .filter(|r| filter(r))
            .filter_map(|r| {
                let location = r.location.as_ref()?;
                let d = haversine_distance(center, location);
                (d <= radius_m).then_some((d, r))
            })
            .collect();

        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        hits.truncate(limit);
        hits
    }
}

/// Persistent report storage with serialised read-modify-write transactions
pub trait ReportStore {
    /// Run `f` against the current report set. Changes are committed only
    /// if `f` returns `Ok`; concurrent transactions never interleave.
    fn transaction<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut ReportSet) -> Result<R, StoreError>;

    fn insert(&self, report: Report) -> Result<Uuid, StoreError> {
        self.transaction(|set| Ok(set.insert(report)))
    }

    fn get(&self, id: Uuid) -> Result<Option<Report>, StoreError> {
        self.transaction(|set| Ok(set.get(id).cloned()))
    }

    fn all(&self) -> Result<Vec<Report>, StoreError> {
        self.transaction(|set| Ok(set.iter().cloned().collect()))
    }
}

/// Process-local store; transactions are serialised by a mutex
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    inner: Mutex<ReportSet>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportStore for InMemoryReportStore {
    fn transaction<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut ReportSet) -> Result<R, StoreError>,
    {
        let mut guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let mut working = guard.clone();
        let result = f(&mut working)?;
        *guard = working;
        Ok(result)
    }
}

/// Store backed by a JSON file. Each transaction takes the sidecar lock
/// file, loads the store, applies the closure and writes the result back
/// through a temp file + rename.
///
/// The lock is a `<store>.lock` file created with `create_new`, so separate
/// handles and separate processes on the same path are serialised too.
#[derive(Debug)]
pub struct JsonFileReportStore {
    path: PathBuf,
    lock_timeout: Duration,
}

/// A lock older than this is left over from a crashed writer
const STALE_LOCK_AGE: Duration = Duration::from_secs(60);
const LOCK_RETRY: Duration = Duration::from_millis(5);

impl JsonFileReportStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: Duration::from_secs(30),
        }
    }

    /// How long a transaction waits for another writer before failing
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    fn acquire(&self) -> Result<StoreLock, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let lock_path = self.lock_path();
        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
                Ok(_) => return Ok(StoreLock { path: lock_path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(&lock_path) {
                        warn!("removing stale store lock {}", lock_path.display());
                        let _ = fs::remove_file(&lock_path);
                        continue;
                    }
                    if started.elapsed() >= self.lock_timeout {
                        return Err(StoreError::LockTimeout(lock_path));
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn load(&self) -> Result<ReportSet, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(ReportSet::default()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ReportSet::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, set: &ReportSet) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(set)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("wrote {} reports to {}", set.len(), self.path.display());
        Ok(())
    }
}

fn is_stale(lock_path: &Path) -> bool {
    fs::metadata(lock_path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}

/// Held for the duration of one transaction; removes the lock file on drop
struct StoreLock {
    path: PathBuf,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("failed to release store lock {}: {e}", self.path.display());
        }
    }
}

impl ReportStore for JsonFileReportStore {
    fn transaction<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut ReportSet) -> Result<R, StoreError>,
    {
        let _lock = self.acquire()?;
        let mut set = self.load()?;
        let result = f(&mut set)?;
        self.save(&set)?;
        Ok(result)
    }
}
