//! Object stores
//!
//! The reconciler talks to persisted objects only through [`ObjectStore`]:
//! `get`, `create` and `update`, keyed by [`ObjectKey`]. Two backends are
//! provided:
//!
//! - [`MemoryStore`], a thread-safe in-process store used by tests and by
//!   embedders that bring their own persistence;
//! - [`FileStore`], one YAML file per object on disk, used by the CLI so
//!   state survives between invocations.
//!
//! Both backends assign `uid` and `resource_version` on create and reject
//! updates that carry a stale `resource_version`, so a lost update between
//! fetch and write surfaces as a [`StoreErrorKind::Conflict`] instead of
//! silently overwriting another writer.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, trace};

use crate::error::{Error, Result, StoreErrorKind};
use crate::resource::{ObjectKey, ObjectMeta, Resource};

/// Access to persisted objects.
///
/// `get` returns `Ok(None)` when the object does not exist; absence is not an
/// error. Implementations never retry.
pub trait ObjectStore {
    fn get<R: Resource>(&self, key: &ObjectKey) -> Result<Option<R>>;

    /// Persist a new object. Fills in `uid` and `resource_version`.
    fn create<R: Resource>(&self, object: &mut R) -> Result<()>;

    /// Persist changes to an existing object. Bumps `resource_version`.
    fn update<R: Resource>(&self, object: &mut R) -> Result<()>;
}

/// Counters of calls served by a [`MemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub gets: usize,
    pub creates: usize,
    pub updates: usize,
}

impl StoreStats {
    /// Number of calls that wrote to the store.
    pub fn writes(&self) -> usize {
        self.creates + self.updates
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: HashMap<ObjectKey, serde_json::Value>,
    next_uid: u64,
    stats: StoreStats,
}

/// In-process object store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(self.lock()?.stats)
    }

    /// Number of objects held.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.objects.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| Error::LockPoisoned {
            context: "memory store".to_string(),
        })
    }
}

impl ObjectStore for MemoryStore {
    fn get<R: Resource>(&self, key: &ObjectKey) -> Result<Option<R>> {
        let mut state = self.lock()?;
        state.stats.gets += 1;
        match state.objects.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    fn create<R: Resource>(&self, object: &mut R) -> Result<()> {
        let key = object.key();
        let mut state = self.lock()?;
        if state.objects.contains_key(&key) {
            return Err(store_error(
                "create",
                &key,
                StoreErrorKind::AlreadyExists,
                "object already exists",
            ));
        }
        state.next_uid += 1;
        let uid = format!("{}-{}", R::KIND.to_lowercase(), state.next_uid);
        stamp_created(object.meta_mut(), uid);
        state.objects.insert(key.clone(), serde_json::to_value(&*object)?);
        state.stats.creates += 1;
        debug!("Created {} in memory store", key);
        Ok(())
    }

    fn update<R: Resource>(&self, object: &mut R) -> Result<()> {
        let key = object.key();
        let mut state = self.lock()?;
        let stored: R = match state.objects.get(&key) {
            Some(value) => serde_json::from_value(value.clone())?,
            None => {
                return Err(store_error(
                    "update",
                    &key,
                    StoreErrorKind::NotFound,
                    "object does not exist",
                ))
            }
        };
        stamp_updated(&key, stored.meta(), object.meta_mut())?;
        state.objects.insert(key.clone(), serde_json::to_value(&*object)?);
        state.stats.updates += 1;
        debug!("Updated {} in memory store", key);
        Ok(())
    }
}

/// Object store backed by a directory of YAML files.
///
/// Layout: `<root>/<kind>/<namespace>/<name>.yaml`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    ///
    /// Every key component becomes one path segment, so components that are
    /// empty, contain a separator, or name `.`/`..` are rejected and the
    /// path always stays under the store root.
    pub fn object_path(&self, key: &ObjectKey) -> Result<PathBuf> {
        for segment in [&key.kind, &key.namespace, &key.name] {
            check_segment(key, segment)?;
        }
        Ok(self
            .root
            .join(&key.kind)
            .join(&key.namespace)
            .join(format!("{}.yaml", key.name)))
    }

    fn read<R: Resource>(&self, key: &ObjectKey) -> Result<Option<R>> {
        let path = self.object_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_yaml::from_str(&content)?))
    }

    fn write<R: Resource>(&self, key: &ObjectKey, object: &R) -> Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(object)?;
        fs::write(&path, content)?;
        trace!("Wrote {}", path.display());
        Ok(())
    }
}

impl ObjectStore for FileStore {
    fn get<R: Resource>(&self, key: &ObjectKey) -> Result<Option<R>> {
        self.read(key)
    }

    fn create<R: Resource>(&self, object: &mut R) -> Result<()> {
        let key = object.key();
        if self.object_path(&key)?.exists() {
            return Err(store_error(
                "create",
                &key,
                StoreErrorKind::AlreadyExists,
                "object already exists",
            ));
        }
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let uid = format!("{}-{:x}", R::KIND.to_lowercase(), nanos);
        stamp_created(object.meta_mut(), uid);
        self.write(&key, object)?;
        debug!("Created {} under {}", key, self.root.display());
        Ok(())
    }

    fn update<R: Resource>(&self, object: &mut R) -> Result<()> {
        let key = object.key();
        let stored: R = self.read(&key)?.ok_or_else(|| {
            store_error(
                "update",
                &key,
                StoreErrorKind::NotFound,
                "object does not exist",
            )
        })?;
        stamp_updated(&key, stored.meta(), object.meta_mut())?;
        self.write(&key, object)?;
        debug!("Updated {} under {}", key, self.root.display());
        Ok(())
    }
}

fn store_error(operation: &str, key: &ObjectKey, kind: StoreErrorKind, message: &str) -> Error {
    Error::Store {
        operation: operation.to_string(),
        key: key.to_string(),
        kind,
        message: message.to_string(),
    }
}

fn check_segment(key: &ObjectKey, segment: &str) -> Result<()> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\']);
    if invalid {
        return Err(store_error(
            "resolve path",
            key,
            StoreErrorKind::Backend,
            &format!("'{}' is not a valid path segment", segment),
        ));
    }
    Ok(())
}

fn stamp_created(meta: &mut ObjectMeta, uid: String) {
    meta.uid = Some(uid);
    meta.resource_version = Some("1".to_string());
}

/// Check the submitted resource version against the stored one and advance
/// it. The stored uid always wins.
fn stamp_updated(key: &ObjectKey, stored: &ObjectMeta, submitted: &mut ObjectMeta) -> Result<()> {
    if submitted.resource_version != stored.resource_version {
        return Err(store_error(
            "update",
            key,
            StoreErrorKind::Conflict,
            &format!(
                "resource version {:?} does not match stored {:?}",
                submitted.resource_version, stored.resource_version
            ),
        ));
    }
    let current: u64 = stored
        .resource_version
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    submitted.resource_version = Some((current + 1).to_string());
    submitted.uid.clone_from(&stored.uid);
    Ok(())
}
