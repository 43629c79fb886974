//! The active scene: map, viewport, fog, tokens and overlays.
//!
//! A [`Session`] is the single owner of all mutable scene state. Hosts call
//! its methods (or feed it [`InputEvent`](crate::InputEvent)s) from one
//! thread; the only operations that wait are asset decoding and store I/O,
//! which are split out as explicit futures.

use crate::core::config::{ConfigProfile, SessionConfig};
use crate::core::geo::{Point, Size};
use crate::core::mapper::CoordinateMapper;
use crate::core::viewport::{ViewState, ViewportController};
use crate::data::autosave::SlotSnapshot;
use crate::data::loader::{fallback_size, AssetLoader, MapAsset};
use crate::data::raster::encode_fog;
use crate::data::scene::{
    ColorField, ImportOutcome, ImportRequest, ImportTicket, PawnRecord, ResolvedContent,
    ResolvedImport, SceneFile,
};
use crate::data::store::{load_scene, AppData, SceneStore, StoreSlot};
use crate::input::interaction::InteractionState;
use crate::layers::fog::{FogBuffer, FogLayer, FogTool};
use crate::layers::tokens::{label_from_file_name, NewToken, Token, TokenId, TokenPlacement, TokenStore};
use crate::plugins::overlay::{OverlayPrimitive, TacticalOverlay};
use crate::{MapError, Result};
use std::time::Instant;

/// Revisions last handed to the store, per slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Persisted {
    map: Option<u64>,
    fog: Option<u64>,
    app: Option<(u64, u64)>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) config: SessionConfig,
    pub(crate) viewport: ViewportController,
    pub(crate) fog: FogLayer,
    pub(crate) tokens: TokenStore,
    pub(crate) overlay: TacticalOverlay,
    pub(crate) interaction: InteractionState,
    pub(crate) map: Option<MapAsset>,
    pub(crate) container: Size,
    pub(crate) pointer: Point,
    generation: u64,
    map_revision: u64,
    persisted: Persisted,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            viewport: ViewportController::new(config.viewport.clone()),
            fog: FogLayer::new(config.fog.brush_size),
            tokens: TokenStore::new(config.tokens.clone()),
            overlay: TacticalOverlay::new(config.overlay.clone()),
            interaction: InteractionState::Idle,
            map: None,
            container: fallback_size(),
            pointer: Point::default(),
            generation: 0,
            map_revision: 0,
            persisted: Persisted::default(),
            config,
        }
    }

    pub fn with_profile(profile: &ConfigProfile) -> Self {
        Self::new(profile.resolve())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn view_state(&self) -> ViewState {
        self.viewport.state()
    }

    pub fn fog(&self) -> &FogLayer {
        &self.fog
    }

    /// Render target for the fog layer
    pub fn fog_buffer(&self) -> &FogBuffer {
        self.fog.buffer()
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id)
    }

    pub fn overlay(&self) -> &TacticalOverlay {
        &self.overlay
    }

    pub fn overlay_primitives(&self) -> Vec<OverlayPrimitive> {
        self.overlay.primitives()
    }

    pub fn interaction(&self) -> InteractionState {
        self.interaction
    }

    pub fn map(&self) -> Option<&MapAsset> {
        self.map.as_ref()
    }

    pub fn has_map(&self) -> bool {
        self.map.is_some()
    }

    /// Generation of the most recently started import
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn container(&self) -> Size {
        self.container
    }

    /// The host's map container was resized
    pub fn set_container(&mut self, size: Size) {
        self.container = size;
    }

    /// Last pointer position seen, in screen space
    pub fn pointer(&self) -> Point {
        self.pointer
    }

    pub fn set_pointer(&mut self, pointer: Point) {
        self.pointer = pointer;
    }

    /// Native size of the loaded map, or the fallback space without one
    pub fn native_size(&self) -> Size {
        self.map
            .as_ref()
            .map(MapAsset::native_size)
            .unwrap_or_else(fallback_size)
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::for_view(&self.viewport.state(), self.container, self.native_size())
    }

    pub fn screen_to_map(&self, screen: Point) -> Point {
        self.mapper().screen_to_map(screen)
    }

    pub fn map_to_screen(&self, map: Point) -> Point {
        self.mapper().map_to_screen(map)
    }

    /// Where tokens land when no position is given
    pub fn default_center(&self) -> Point {
        self.native_size().center()
    }

    fn reveal_radius(&self, diameter: f64) -> f64 {
        diameter * self.config.fog.reveal_multiplier
    }

    fn reveal_around(&mut self, placement: TokenPlacement) {
        let radius = self.reveal_radius(placement.diameter);
        self.fog.reveal(placement.position, radius);
    }

    // Tokens

    /// Create a token and reveal the fog around it
    pub fn create_token(&mut self, new: NewToken) -> TokenId {
        let placement = self.tokens.create(new, self.default_center());
        self.reveal_around(placement);
        log::debug!(
            "created {} at ({:.1}, {:.1})",
            placement.id,
            placement.position.x,
            placement.position.y
        );
        placement.id
    }

    /// Create a token from an uploaded image, labelled after the file
    pub fn create_token_from_file(
        &mut self,
        image_ref: impl Into<String>,
        file_name: &str,
        position: Option<Point>,
    ) -> TokenId {
        let mut new = NewToken::new(image_ref);
        new.position = position;
        new.label = label_from_file_name(file_name);
        self.create_token(new)
    }

    /// Begin dragging; rejected while fog editing
    pub fn start_token_drag(&mut self, id: TokenId) -> bool {
        self.tokens.start_drag(id, self.fog.is_editing())
    }

    /// Move the dragged token by a screen-space delta
    pub fn drag_token_by(&mut self, screen_delta: Point) -> Option<TokenPlacement> {
        let placement = self.tokens.update_drag(screen_delta, self.viewport.scale())?;
        self.reveal_around(placement);
        Some(placement)
    }

    pub fn end_token_drag(&mut self) {
        self.tokens.end_drag();
    }

    pub fn resize_token(&mut self, id: TokenId, wheel_delta: f64) -> Option<f64> {
        self.tokens.resize(id, wheel_delta)
    }

    pub fn cycle_token_color(&mut self, id: TokenId) -> Option<usize> {
        self.tokens.cycle_color(id)
    }

    pub fn rename_token(&mut self, id: TokenId, label: &str) -> bool {
        self.tokens.rename(id, label)
    }

    pub fn remove_token(&mut self, id: TokenId) -> Option<Token> {
        if self.interaction.dragged_token() == Some(id) {
            self.interaction = InteractionState::Idle;
        }
        let removed = self.tokens.remove(id);
        if let Some(token) = &removed {
            log::debug!("removed {} ({})", token.id, token.label);
        }
        removed
    }

    pub fn copy_token(&mut self, id: TokenId) -> bool {
        self.tokens.copy(id)
    }

    /// Paste the clipboard at a screen position.
    ///
    /// `Ok(None)` when the clipboard is empty.
    pub fn paste_at(&mut self, screen: Point) -> Result<Option<TokenId>> {
        if self.map.is_none() {
            return Err(MapError::NoMapLoaded);
        }
        let at = self.screen_to_map(screen);
        let Some(placement) = self.tokens.paste(at) else {
            return Ok(None);
        };
        self.reveal_around(placement);
        Ok(Some(placement.id))
    }

    pub fn paste_at_pointer(&mut self) -> Result<Option<TokenId>> {
        self.paste_at(self.pointer)
    }

    // Fog

    pub fn set_fog_editing(&mut self, editing: bool) {
        self.fog.set_editing(editing);
    }

    pub fn toggle_fog_editing(&mut self) -> bool {
        let editing = !self.fog.is_editing();
        self.fog.set_editing(editing);
        editing
    }

    pub fn set_fog_tool(&mut self, tool: FogTool) {
        self.fog.set_tool(tool);
    }

    pub fn set_brush_size(&mut self, size: f64) {
        self.fog.set_brush_size(size);
    }

    pub fn set_fog_visible(&mut self, visible: bool) {
        self.fog.set_visible(visible);
    }

    pub fn toggle_fog_visible(&mut self) -> bool {
        self.fog.toggle_visible()
    }

    pub fn reveal(&mut self, center: Point, radius: f64) {
        self.fog.reveal(center, radius);
    }

    pub fn hide(&mut self, center: Point, radius: f64) {
        self.fog.hide(center, radius);
    }

    /// Cover the whole map again, keeping every token visible
    pub fn reset_fog(&mut self) {
        self.fog.fill();
        self.fog
            .restore_around_tokens(self.tokens.tokens(), self.config.fog.reveal_multiplier);
        log::info!("fog reset around {} token(s)", self.tokens.len());
    }

    // Viewport

    pub fn zoom(&mut self, wheel_delta: f64) -> bool {
        self.viewport.zoom(wheel_delta)
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    pub fn set_view(&mut self, view: ViewState) {
        self.viewport.set_state(view);
    }

    /// End whatever gesture is in progress
    pub fn cancel_interaction(&mut self) {
        self.viewport.end_pan();
        self.tokens.end_drag();
        self.overlay.cancel();
        self.interaction = InteractionState::Idle;
    }

    /// Drop expired overlay primitives
    pub fn tick(&mut self, now: Instant) -> usize {
        self.overlay.prune(now)
    }

    // Import

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Start loading a new map. Tokens, fog and view are reset once it loads.
    pub fn begin_map_load(&mut self, src: impl Into<String>) -> ImportTicket {
        ImportTicket {
            generation: self.next_generation(),
            request: ImportRequest::NewMap { src: src.into() },
        }
    }

    /// Parse a scene and start importing it.
    ///
    /// Malformed input fails here, before anything changes. Unless
    /// `import.defer_token_clear` is set, existing tokens are cleared now,
    /// so a later asset failure leaves an empty token set.
    pub fn begin_import(&mut self, json: &str) -> Result<ImportTicket> {
        let scene = SceneFile::from_json(json)?;
        Ok(self.begin_scene(scene))
    }

    pub fn begin_scene(&mut self, scene: SceneFile) -> ImportTicket {
        let generation = self.next_generation();
        if !self.config.import.defer_token_clear {
            self.cancel_interaction();
            self.tokens.clear();
        }
        log::info!(
            "import {} started (scene version {}, {} token(s))",
            generation,
            scene.version,
            scene.pawns().len()
        );
        ImportTicket {
            generation,
            request: ImportRequest::Scene(scene),
        }
    }

    /// Apply loaded assets, unless a newer import has started meanwhile
    pub fn finish_import(&mut self, resolved: ResolvedImport) -> ImportOutcome {
        if resolved.generation != self.generation {
            log::warn!(
                "discarding import {}: superseded by {}",
                resolved.generation,
                self.generation
            );
            return ImportOutcome::Superseded {
                generation: resolved.generation,
            };
        }

        let ResolvedImport {
            generation,
            asset,
            content,
        } = resolved;
        let (width, height) = (asset.width, asset.height);
        self.cancel_interaction();
        self.overlay.clear();
        self.map = Some(asset);
        self.map_revision += 1;

        let created = match content {
            ResolvedContent::NewMap => {
                self.tokens.clear();
                self.fog.reset_for_map(width, height);
                self.viewport.reset();
                0
            }
            ResolvedContent::Scene { fog, pawns, view } => {
                if self.config.import.defer_token_clear {
                    self.tokens.clear();
                }
                self.fog.restore(width, height, fog.as_ref());
                for pawn in &pawns {
                    let new = self.pawn_to_token(pawn);
                    self.create_token(new);
                }
                if let Some(view) = view {
                    self.viewport.set_state(view);
                }
                pawns.len()
            }
        };

        log::info!(
            "import {} applied: {}x{} map, {} token(s)",
            generation,
            width,
            height,
            created
        );
        ImportOutcome::Applied {
            generation,
            tokens: created,
        }
    }

    fn pawn_to_token(&self, pawn: &PawnRecord) -> NewToken {
        let config = self.tokens.config();
        let mut new = NewToken::new(pawn.src.clone()).at(Point::new(pawn.x, pawn.y));
        new.diameter = pawn.w;
        new.color_index = pawn.c.as_ref().map(|c| c.resolve(&config.palette));
        new.label = Some(
            pawn.name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| config.default_label.clone()),
        );
        new
    }

    /// Load a new map and reset the scene around it
    pub async fn load_map(&mut self, src: &str, loader: &dyn AssetLoader) -> Result<ImportOutcome> {
        let ticket = self.begin_map_load(src);
        let resolved = ticket.resolve(loader).await?;
        Ok(self.finish_import(resolved))
    }

    /// Import a serialized scene end to end
    pub async fn import_json(&mut self, json: &str, loader: &dyn AssetLoader) -> Result<ImportOutcome> {
        let ticket = self.begin_import(json)?;
        let resolved = ticket.resolve(loader).await?;
        Ok(self.finish_import(resolved))
    }

    /// Import the last persisted scene, if the store has one
    pub async fn restore_from_store(
        &mut self,
        store: &dyn SceneStore,
        loader: &dyn AssetLoader,
    ) -> Result<Option<ImportOutcome>> {
        let Some(scene) = load_scene(store).await? else {
            log::debug!("store holds no scene");
            return Ok(None);
        };
        let ticket = self.begin_scene(scene);
        let resolved = ticket.resolve(loader).await?;
        Ok(Some(self.finish_import(resolved)))
    }

    // Export

    fn pawn_records(&self) -> Vec<PawnRecord> {
        self.tokens
            .tokens()
            .iter()
            .map(|token| PawnRecord {
                src: token.image_ref.clone(),
                x: token.position.x,
                y: token.position.y,
                w: Some(token.diameter),
                c: Some(ColorField::for_index(
                    token.color_index,
                    &self.config.tokens.palette,
                )),
                name: Some(token.label.clone()),
            })
            .collect()
    }

    /// Snapshot the whole scene
    pub fn export_scene(&self) -> Result<SceneFile> {
        let map = self.map.as_ref().ok_or(MapError::NoMapLoaded)?;
        let scene = SceneFile {
            version: crate::core::constants::SCENE_VERSION.to_string(),
            map_src: map.src.clone(),
            fog_data: Some(encode_fog(self.fog.buffer())?),
            pawns: Some(self.pawn_records()),
            view: Some(self.viewport.state()),
        };
        log::info!("exported scene with {} token(s)", self.tokens.len());
        Ok(scene)
    }

    pub fn export_json(&self) -> Result<String> {
        self.export_scene()?.to_json()
    }

    /// View and token list as stored in the `app_data` slot
    pub fn app_data(&self) -> AppData {
        AppData::new(self.viewport.state(), self.pawn_records())
    }

    // Persistence

    fn app_revision(&self) -> (u64, u64) {
        (self.tokens.revision(), self.viewport.revision())
    }

    /// Serialize the slots changed since the previous call.
    ///
    /// Nothing is reported until a map is loaded.
    pub fn dirty_snapshots(&mut self) -> Result<Vec<SlotSnapshot>> {
        let Some(map) = &self.map else {
            return Ok(Vec::new());
        };
        let mut snapshots = Vec::new();
        let mut persisted = self.persisted;

        if persisted.map != Some(self.map_revision) {
            snapshots.push(SlotSnapshot::new(StoreSlot::MapImage, map.src.clone()));
            persisted.map = Some(self.map_revision);
        }
        if persisted.fog != Some(self.fog.revision()) {
            snapshots.push(SlotSnapshot::new(
                StoreSlot::FogImage,
                encode_fog(self.fog.buffer())?,
            ));
            persisted.fog = Some(self.fog.revision());
        }
        let app_revision = self.app_revision();
        if persisted.app != Some(app_revision) {
            snapshots.push(SlotSnapshot::new(StoreSlot::AppData, self.app_data().to_json()?));
            persisted.app = Some(app_revision);
        }

        self.persisted = persisted;
        Ok(snapshots)
    }

    /// Forget what has been persisted, so every slot is written again
    pub fn mark_all_dirty(&mut self) {
        self.persisted = Persisted::default();
    }

    /// Hand dirty slots to the autosave worker; returns how many were queued
    #[cfg(feature = "tokio-runtime")]
    pub fn autosave(&mut self, handle: &crate::data::autosave::AutosaveHandle) -> Result<usize> {
        if !self.config.persistence.autosave {
            return Ok(0);
        }
        let snapshots = self.dirty_snapshots()?;
        let count = snapshots.len();
        for snapshot in snapshots {
            if !handle.save(snapshot) {
                return Err(MapError::Store("autosave worker stopped".to_string()));
            }
        }
        Ok(count)
    }

    /// Write dirty slots straight to a store
    pub async fn save_to(&mut self, store: &dyn SceneStore) -> Result<usize> {
        let snapshots = self.dirty_snapshots()?;
        let count = snapshots.len();
        for snapshot in snapshots {
            if let Err(e) = store.write(snapshot.slot, snapshot.payload).await {
                self.mark_all_dirty();
                return Err(e);
            }
        }
        Ok(count)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::with_profile(&ConfigProfile::default())
    }
}
