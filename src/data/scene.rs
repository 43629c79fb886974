//! Scene exchange format and the staged import pipeline.
//!
//! A scene file is a JSON object:
//!
//! ```json
//! { "version": "1.1", "mapSrc": "data:image/png;base64,...",
//!   "fogData": "data:image/png;base64,...",
//!   "pawns": [{ "src": "...", "x": 600, "y": 500, "w": 60, "c": "#2ecc71", "name": "Goblin" }],
//!   "view": { "scale": 1.0, "x": 0.0, "y": 0.0 } }
//! ```
//!
//! Older files may lack any field but `mapSrc`; missing values fall back to
//! defaults. Importing runs in three steps so that only the middle one
//! awaits: [`Session::begin_import`](crate::Session::begin_import) hands out
//! an [`ImportTicket`], [`ImportTicket::resolve`] loads the assets, and
//! [`Session::finish_import`](crate::Session::finish_import) applies the
//! result unless a newer ticket has been issued since.

use crate::core::constants::SCENE_VERSION;
use crate::core::viewport::ViewState;
use crate::data::loader::{AssetLoader, MapAsset};
use crate::layers::fog::FogBuffer;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFile {
    #[serde(default = "unversioned")]
    pub version: String,
    pub map_src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fog_data: Option<String>,
    #[serde(default)]
    pub pawns: Option<Vec<PawnRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewState>,
}

fn unversioned() -> String {
    "1.0".to_string()
}

impl SceneFile {
    pub fn new(map_src: impl Into<String>) -> Self {
        Self {
            version: SCENE_VERSION.to_string(),
            map_src: map_src.into(),
            fog_data: None,
            pawns: Some(Vec::new()),
            view: None,
        }
    }

    /// Parse and validate a scene. Never partially succeeds.
    pub fn from_json(json: &str) -> Result<Self> {
        let scene: SceneFile = serde_json::from_str(json)
            .map_err(|e| MapError::InvalidSceneFormat(e.to_string()))?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.map_src.trim().is_empty() {
            return Err(MapError::InvalidSceneFormat(
                "scene has no map source".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pawns(&self) -> &[PawnRecord] {
        self.pawns.as_deref().unwrap_or(&[])
    }
}

/// One persisted token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PawnRecord {
    pub src: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<ColorField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Border color as written by different versions: a palette index, a
/// `#rrggbb` string or a computed CSS `rgb(r, g, b)` string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorField {
    Index(usize),
    Css(String),
}

impl ColorField {
    /// Palette index this color refers to; unknown colors map to 0.
    ///
    /// A CSS string first matches a palette entry by name (ignoring case),
    /// then by parsed RGB value. The first matching entry wins.
    pub fn resolve(&self, palette: &[String]) -> usize {
        match self {
            ColorField::Index(i) if *i < palette.len() => *i,
            ColorField::Index(_) => 0,
            ColorField::Css(css) => {
                let css = css.trim();
                palette
                    .iter()
                    .position(|entry| entry.trim().eq_ignore_ascii_case(css))
                    .or_else(|| {
                        let rgb = parse_css_color(css)?;
                        palette
                            .iter()
                            .position(|entry| parse_css_color(entry) == Some(rgb))
                    })
                    .unwrap_or(0)
            }
        }
    }

    /// Field to write for a palette index: the palette string when it reads
    /// back as the same index, the bare index otherwise
    pub fn for_index(index: usize, palette: &[String]) -> Self {
        match palette.get(index) {
            Some(css) if ColorField::Css(css.clone()).resolve(palette) == index => {
                ColorField::Css(css.clone())
            }
            _ => ColorField::Index(index),
        }
    }
}

/// Parse `#rgb`, `#rrggbb` or `rgb(r, g, b)` into components
pub fn parse_css_color(css: &str) -> Option<(u8, u8, u8)> {
    let css = css.trim().to_ascii_lowercase();
    if let Some(hex) = css.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        return Some((channel(0)?, channel(2)?, channel(4)?));
    }
    let inner = css
        .strip_prefix("rgba(")
        .or_else(|| css.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u8>().ok());
    Some((parts.next()??, parts.next()??, parts.next()??))
}

/// Result of applying an import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Applied { generation: u64, tokens: usize },
    /// A newer import was started before this one finished
    Superseded { generation: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ImportRequest {
    NewMap { src: String },
    Scene(SceneFile),
}

/// A started import waiting for its assets
#[derive(Debug, Clone, PartialEq)]
pub struct ImportTicket {
    pub(crate) generation: u64,
    pub(crate) request: ImportRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ResolvedContent {
    NewMap,
    Scene {
        fog: Option<FogBuffer>,
        pawns: Vec<PawnRecord>,
        view: Option<ViewState>,
    },
}

/// An import whose assets have finished loading
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImport {
    pub(crate) generation: u64,
    pub(crate) asset: MapAsset,
    pub(crate) content: ResolvedContent,
}

impl ResolvedImport {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn asset(&self) -> &MapAsset {
        &self.asset
    }
}

impl ImportTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Load the map and, for scenes, the fog raster concurrently
    pub async fn resolve(self, loader: &dyn AssetLoader) -> Result<ResolvedImport> {
        match self.request {
            ImportRequest::NewMap { src } => {
                let asset = loader.load_map(&src).await?;
                Ok(ResolvedImport {
                    generation: self.generation,
                    asset,
                    content: ResolvedContent::NewMap,
                })
            }
            ImportRequest::Scene(scene) => {
                let fog_src = scene.fog_data.as_deref().filter(|s| !s.trim().is_empty());
                let fog = async {
                    match fog_src {
                        Some(src) => loader.load_raster(src).await.map(Some),
                        None => Ok(None),
                    }
                };
                let (asset, fog) =
                    futures::future::try_join(loader.load_map(&scene.map_src), fog).await?;

                Ok(ResolvedImport {
                    generation: self.generation,
                    asset,
                    content: ResolvedContent::Scene {
                        fog,
                        pawns: scene.pawns.unwrap_or_default(),
                        view: scene.view,
                    },
                })
            }
        }
    }
}
