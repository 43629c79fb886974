//! Persisted scene slots.
//!
//! The engine keeps its last state in three independent slots: the map
//! image source, the fog raster and an `app_data` record with the view and
//! the token list. Slots are written separately so that, for example,
//! dragging a token never rewrites a multi-megabyte map image.

use crate::core::constants::{APP_DATA_SCHEMA, DEFAULT_TOKEN_LABEL, SCENE_VERSION};
use crate::core::viewport::ViewState;
use crate::data::scene::{PawnRecord, SceneFile};
use crate::{MapError, Result};
use async_trait::async_trait;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreSlot {
    MapImage,
    FogImage,
    AppData,
}

impl StoreSlot {
    pub const ALL: [StoreSlot; 3] = [StoreSlot::MapImage, StoreSlot::FogImage, StoreSlot::AppData];

    pub fn key(self) -> &'static str {
        match self {
            StoreSlot::MapImage => "map_image",
            StoreSlot::FogImage => "fog_image",
            StoreSlot::AppData => "app_data",
        }
    }
}

impl fmt::Display for StoreSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Key-value storage for the three scene slots
#[async_trait]
pub trait SceneStore: Send + Sync {
    async fn read(&self, slot: StoreSlot) -> Result<Option<String>>;

    async fn write(&self, slot: StoreSlot, payload: String) -> Result<()>;

    async fn remove(&self, slot: StoreSlot) -> Result<()>;
}

/// In-process store, mostly for tests and headless hosts
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<FxHashMap<StoreSlot, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, slot: StoreSlot) -> Option<String> {
        self.slots.lock().ok()?.get(&slot).cloned()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FxHashMap<StoreSlot, String>>> {
        self.slots
            .lock()
            .map_err(|_| MapError::Store("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SceneStore for MemoryStore {
    async fn read(&self, slot: StoreSlot) -> Result<Option<String>> {
        Ok(self.lock()?.get(&slot).cloned())
    }

    async fn write(&self, slot: StoreSlot, payload: String) -> Result<()> {
        self.lock()?.insert(slot, payload);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, slot: StoreSlot) -> Result<()> {
        self.lock()?.remove(&slot);
        Ok(())
    }
}

/// One file per slot inside a directory
#[cfg(feature = "tokio-runtime")]
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: std::path::PathBuf,
}

#[cfg(feature = "tokio-runtime")]
impl FileStore {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    pub fn slot_path(&self, slot: StoreSlot) -> std::path::PathBuf {
        let extension = match slot {
            StoreSlot::AppData => "json",
            StoreSlot::MapImage | StoreSlot::FogImage => "txt",
        };
        self.dir.join(format!("{}.{}", slot.key(), extension))
    }
}

#[cfg(feature = "tokio-runtime")]
#[async_trait]
impl SceneStore for FileStore {
    async fn read(&self, slot: StoreSlot) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.slot_path(slot)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, slot: StoreSlot, payload: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.slot_path(slot);
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, payload).await?;
        tokio::fs::rename(&staging, &path).await?;
        log::debug!("wrote {} to {}", slot, path.display());
        Ok(())
    }

    async fn remove(&self, slot: StoreSlot) -> Result<()> {
        match tokio::fs::remove_file(self.slot_path(slot)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The `app_data` record.
///
/// Schema 1 records predate token labels; they are upgraded on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppData {
    #[serde(default = "legacy_schema")]
    pub schema: u32,
    #[serde(default)]
    pub view: Option<ViewState>,
    #[serde(default)]
    pub pawns: Vec<PawnRecord>,
}

fn legacy_schema() -> u32 {
    1
}

impl AppData {
    pub fn new(view: ViewState, pawns: Vec<PawnRecord>) -> Self {
        Self {
            schema: APP_DATA_SCHEMA,
            view: Some(view),
            pawns,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: AppData = serde_json::from_str(json)
            .map_err(|e| MapError::InvalidSceneFormat(format!("app_data: {}", e)))?;
        data.migrate()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Bring an older record up to the current schema
    pub fn migrate(mut self) -> Result<Self> {
        if self.schema > APP_DATA_SCHEMA {
            return Err(MapError::InvalidSceneFormat(format!(
                "app_data schema {} is newer than supported ({})",
                self.schema, APP_DATA_SCHEMA
            )));
        }
        if self.schema < 2 {
            for pawn in &mut self.pawns {
                if pawn.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
                    pawn.name = Some(DEFAULT_TOKEN_LABEL.to_string());
                }
            }
            log::info!("migrated app_data from schema {} to 2", self.schema);
            self.schema = 2;
        }
        Ok(self)
    }
}

/// Rebuild the last scene from a store. `None` when no map was ever saved.
pub async fn load_scene(store: &dyn SceneStore) -> Result<Option<SceneFile>> {
    let Some(map_src) = store.read(StoreSlot::MapImage).await? else {
        return Ok(None);
    };
    if map_src.trim().is_empty() {
        return Ok(None);
    }
    let fog_data = store
        .read(StoreSlot::FogImage)
        .await?
        .filter(|fog| !fog.trim().is_empty());
    let app_data = match store.read(StoreSlot::AppData).await? {
        Some(json) if !json.trim().is_empty() => Some(AppData::from_json(&json)?),
        _ => None,
    };

    let (view, pawns) = match app_data {
        Some(data) => (data.view, data.pawns),
        None => (None, Vec::new()),
    };
    Ok(Some(SceneFile {
        version: SCENE_VERSION.to_string(),
        map_src,
        fog_data,
        pawns: Some(pawns),
        view,
    }))
}

/// Remove every slot
pub async fn clear_store(store: &dyn SceneStore) -> Result<()> {
    for slot in StoreSlot::ALL {
        store.remove(slot).await?;
    }
    Ok(())
}
