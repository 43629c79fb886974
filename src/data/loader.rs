//! Asynchronous asset loading.
//!
//! Decoding a map or a fog raster is the one place where the engine waits
//! on the host. Loaders hide where the bytes come from; the session only
//! ever sees a finished [`MapAsset`] or [`FogBuffer`].

use crate::core::constants::FALLBACK_MAP_SIZE;
use crate::core::geo::{Point, Size};
use crate::data::raster::{decode_data_url, decode_fog, is_data_url, read_dimensions};
use crate::layers::fog::FogBuffer;
use crate::{MapError, Result};
use async_trait::async_trait;

/// A decoded map image. Its native size defines the coordinate space of
/// every other entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapAsset {
    /// Source reference, written back verbatim on export
    pub src: String,
    pub width: u32,
    pub height: u32,
}

impl MapAsset {
    pub fn new(src: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            src: src.into(),
            width,
            height,
        }
    }

    pub fn native_size(&self) -> Size {
        Size::from((self.width, self.height))
    }

    pub fn center(&self) -> Point {
        self.native_size().center()
    }
}

/// Native size assumed before any map is loaded
pub fn fallback_size() -> Size {
    Size::from(FALLBACK_MAP_SIZE)
}

#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Decode the map referenced by `src` far enough to know its size
    async fn load_map(&self, src: &str) -> Result<MapAsset>;

    /// Decode an embedded fog raster
    async fn load_raster(&self, src: &str) -> Result<FogBuffer>;
}

/// Loads `data:` URLs and, for anything else, files from disk
#[derive(Debug, Clone, Default)]
pub struct ImageAssetLoader;

impl ImageAssetLoader {
    pub fn new() -> Self {
        Self
    }

    async fn read_bytes(&self, src: &str) -> Result<Vec<u8>> {
        if is_data_url(src) {
            return decode_data_url(src).map(|(_, bytes)| bytes);
        }
        read_file(src)
            .await
            .map_err(|e| MapError::AssetLoadFailure(format!("{}: {}", src, e)))
    }
}

#[cfg(feature = "tokio-runtime")]
async fn read_file(path: &str) -> std::io::Result<Vec<u8>> {
    tokio::fs::read(path).await
}

#[cfg(not(feature = "tokio-runtime"))]
async fn read_file(path: &str) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}

#[async_trait]
impl AssetLoader for ImageAssetLoader {
    async fn load_map(&self, src: &str) -> Result<MapAsset> {
        if src.trim().is_empty() {
            return Err(MapError::AssetLoadFailure("empty map source".to_string()));
        }
        let bytes = self.read_bytes(src).await?;
        let (width, height) = read_dimensions(&bytes).map_err(|e| {
            log::warn!("map decode failed: {}", e);
            e
        })?;
        if width == 0 || height == 0 {
            return Err(MapError::AssetLoadFailure(format!(
                "map has no area ({}x{})",
                width, height
            )));
        }
        log::debug!("decoded map header: {}x{}", width, height);
        Ok(MapAsset::new(src, width, height))
    }

    async fn load_raster(&self, src: &str) -> Result<FogBuffer> {
        let bytes = self.read_bytes(src).await?;
        decode_fog(&bytes).map_err(|e| {
            log::warn!("fog raster decode failed: {}", e);
            e
        })
    }
}
