//! # fogmap
//!
//! An interactive tabletop map engine with a persistent fog-of-war layer.
//!
//! The crate owns the parts of a virtual tabletop that have to agree on
//! coordinates: the pan/zoom viewport, the fog raster sized to the map's
//! native resolution, the tokens placed on the map, ephemeral tactical
//! overlays, and the scene format that round-trips all of it.
//!
//! Rendering and asset acquisition stay with the host. The host feeds
//! [`InputEvent`]s into a [`Session`] and reads back the view state, fog
//! buffer, token list and overlay primitives to draw them.

pub mod core;
pub mod data;
pub mod input;
pub mod layers;
#[cfg(feature = "debug")]
pub mod logging;
pub mod plugins;
pub mod prelude;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{ConfigProfile, SessionConfig},
    geo::{Point, ScreenRect, Size},
    mapper::CoordinateMapper,
    session::Session,
    viewport::{ViewState, ViewportController},
};

pub use layers::{
    fog::{FogBuffer, FogLayer, FogOp, FogTool},
    tokens::{Token, TokenId, TokenStore},
};

pub use input::{events::InputEvent, interaction::InteractionState};

pub use plugins::overlay::{OverlayPrimitive, TacticalOverlay};

pub use data::{
    loader::{AssetLoader, ImageAssetLoader, MapAsset},
    scene::{ImportOutcome, SceneFile},
    store::{MemoryStore, SceneStore, StoreSlot},
};

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Invalid scene format: {0}")]
    InvalidSceneFormat(String),

    #[error("No map loaded")]
    NoMapLoaded,

    #[error("Asset load failure: {0}")]
    AssetLoadFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Store error: {0}")]
    Store(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;
