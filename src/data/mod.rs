//! Scene data: asset loading, the exchange format and persistence.

pub mod autosave;
pub mod loader;
pub mod raster;
pub mod scene;
pub mod store;

pub use autosave::{PendingWrites, SlotSnapshot};
#[cfg(feature = "tokio-runtime")]
pub use autosave::{spawn_autosave, AutosaveHandle};
pub use loader::{AssetLoader, ImageAssetLoader, MapAsset};
pub use scene::{ImportOutcome, ImportTicket, PawnRecord, ResolvedImport, SceneFile};
#[cfg(feature = "tokio-runtime")]
pub use store::FileStore;
pub use store::{AppData, MemoryStore, SceneStore, StoreSlot};
