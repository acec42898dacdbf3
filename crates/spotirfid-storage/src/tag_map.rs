//! Durable mapping from tag UID to resource.
//!
//! The map is a single JSON object keyed by upper-case hex UID:
//!
//! ```json
//! {
//!   "04A1B2C3": "spotify:album:6jbtHi5R0jMXoliU2OS0lo"
//! }
//! ```
//!
//! Every commit rewrites the whole file through a temporary file in the same
//! directory followed by a rename, so a crash leaves either the old or the
//! new map on disk, never a torn one.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spotirfid_core::{ResourceId, TagUid};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// In-memory tag map. Keys are unique; insertion replaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap {
    entries: BTreeMap<TagUid, ResourceId>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uid: &TagUid) -> Option<&ResourceId> {
        self.entries.get(uid)
    }

    /// Insert or replace, returning the previous resource.
    pub fn insert(&mut self, uid: TagUid, resource: ResourceId) -> Option<ResourceId> {
        self.entries.insert(uid, resource)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagUid, &ResourceId)> {
        self.entries.iter()
    }
}

/// A [`TagMap`] bound to its file.
///
/// # Examples
///
/// ```no_run
/// use spotirfid_storage::TagMapStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = TagMapStore::load("tag_map.json").await;
/// store
///     .insert_and_save("04A1B2C3".parse()?, "spotify:album:6jbtHi5R0jMXoliU2OS0lo".parse()?)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TagMapStore {
    path: PathBuf,
    map: TagMap,
}

impl TagMapStore {
    /// Load the map at `path`.
    ///
    /// A missing file starts an empty map. An unreadable or corrupt file is
    /// logged and also starts an empty map; it is overwritten by the next
    /// commit.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let map = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<TagMap>(&contents) {
                Ok(map) => {
                    info!("Loaded {} tag mappings from {}", map.len(), path.display());
                    map
                }
                Err(e) => {
                    warn!("Tag map {} is corrupt, starting empty: {e}", path.display());
                    TagMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No tag map at {}, starting empty", path.display());
                TagMap::new()
            }
            Err(e) => {
                warn!("Tag map {} is unreadable, starting empty: {e}", path.display());
                TagMap::new()
            }
        };

        Self { path, map }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn map(&self) -> &TagMap {
        &self.map
    }

    pub fn get(&self, uid: &TagUid) -> Option<&ResourceId> {
        self.map.get(uid)
    }

    /// Record a mapping and rewrite the file.
    ///
    /// The in-memory map only changes if the file was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the map cannot be encoded or written.
    pub async fn insert_and_save(
        &mut self,
        uid: TagUid,
        resource: ResourceId,
    ) -> StorageResult<Option<ResourceId>> {
        let mut updated = self.map.clone();
        let previous = updated.insert(uid.clone(), resource.clone());

        let contents = serde_json::to_string_pretty(&updated)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, contents.as_bytes()))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))??;

        self.map = updated;
        debug!("Saved mapping {uid} -> {resource}");
        Ok(previous)
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    file.write_all(contents)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| StorageError::io(file.path(), e))?;
    file.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}
