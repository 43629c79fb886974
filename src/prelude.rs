//! Prelude module for common fogmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use fogmap::prelude::*;`

pub use crate::core::{
    config::{
        ConfigProfile, FogConfig, ImportConfig, OverlayConfig, PersistenceConfig, ResizeBinding,
        SessionConfig, TokenConfig, ViewportConfig,
    },
    geo::{Point, ScreenRect, Size},
    mapper::CoordinateMapper,
    session::Session,
    viewport::{ViewState, ViewportController},
};

pub use crate::layers::{
    fog::{FogBuffer, FogLayer, FogOp, FogTool},
    tokens::{label_from_file_name, NewToken, Token, TokenId, TokenStore},
};

pub use crate::plugins::overlay::{OverlayPrimitive, TacticalOverlay};

pub use crate::input::{
    events::{EventHandled, InputEvent, KeyCode, KeyModifiers, MouseButton},
    interaction::InteractionState,
};

pub use crate::data::{
    loader::{AssetLoader, ImageAssetLoader, MapAsset},
    scene::{ImportOutcome, ImportTicket, SceneFile},
    store::{MemoryStore, SceneStore, StoreSlot},
};

#[cfg(feature = "tokio-runtime")]
pub use crate::data::{
    autosave::{spawn_autosave, AutosaveHandle},
    store::FileStore,
};

pub use crate::{Error as MapError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
