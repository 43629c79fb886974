//! Tokens placed on the map and their interaction state.
//!
//! Positions and diameters are in native map pixels. The store never
//! touches the fog directly: every operation that places a token returns a
//! [`TokenPlacement`] and the owner reveals the fog around it.

use crate::core::config::TokenConfig;
use crate::core::geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(u64);

impl TokenId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: TokenId,
    pub position: Point,
    pub diameter: f64,
    pub color_index: usize,
    pub label: String,
    pub image_ref: String,
}

impl Token {
    /// Whether `point` falls on the token's disc
    pub fn contains(&self, point: &Point) -> bool {
        self.position.distance_to(point) <= self.diameter / 2.0
    }

    pub fn template(&self) -> TokenTemplate {
        TokenTemplate {
            image_ref: self.image_ref.clone(),
            diameter: self.diameter,
            color_index: self.color_index,
            label: self.label.clone(),
        }
    }
}

/// Next palette index, wrapping around
pub fn next_color(index: usize, palette_len: usize) -> usize {
    (index + 1) % palette_len.max(1)
}

/// Label derived from an uploaded file name: `"Goblin.png"` → `"Goblin"`
pub fn label_from_file_name(file_name: &str) -> Option<String> {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    };
    let stem = stem.trim();
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Visual attributes captured by copy
#[derive(Debug, Clone, PartialEq)]
pub struct TokenTemplate {
    pub image_ref: String,
    pub diameter: f64,
    pub color_index: usize,
    pub label: String,
}

/// Parameters for [`TokenStore::create`]; unset fields take defaults
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewToken {
    pub image_ref: String,
    pub position: Option<Point>,
    pub diameter: Option<f64>,
    pub color_index: Option<usize>,
    pub label: Option<String>,
}

impl NewToken {
    pub fn new(image_ref: impl Into<String>) -> Self {
        Self {
            image_ref: image_ref.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn diameter(mut self, diameter: f64) -> Self {
        self.diameter = Some(diameter);
        self
    }

    pub fn color(mut self, color_index: usize) -> Self {
        self.color_index = Some(color_index);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn from_template(template: &TokenTemplate, position: Point) -> Self {
        Self {
            image_ref: template.image_ref.clone(),
            position: Some(position),
            diameter: Some(template.diameter),
            color_index: Some(template.color_index),
            label: Some(template.label.clone()),
        }
    }
}

/// A token has been placed or moved; the fog must be revealed around it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenPlacement {
    pub id: TokenId,
    pub position: Point,
    pub diameter: f64,
}

#[derive(Debug, Clone)]
pub struct TokenStore {
    config: TokenConfig,
    tokens: Vec<Token>,
    next_id: u64,
    dragging: Option<TokenId>,
    hovered: Option<TokenId>,
    clipboard: Option<TokenTemplate>,
    revision: u64,
}

impl TokenStore {
    pub fn new(config: TokenConfig) -> Self {
        Self {
            config,
            tokens: Vec::new(),
            next_id: 1,
            dragging: None,
            hovered: None,
            clipboard: None,
            revision: 0,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Tokens in creation order (render order, last on top)
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.iter_mut().find(|t| t.id == id)
    }

    /// Bumped on every change to persisted token attributes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn palette_color(&self, index: usize) -> Option<&str> {
        self.config.palette.get(index).map(String::as_str)
    }

    pub fn create(&mut self, new: NewToken, default_center: Point) -> TokenPlacement {
        let id = TokenId(self.next_id);
        self.next_id += 1;

        let position = new
            .position
            .filter(Point::is_finite)
            .unwrap_or(default_center);
        let diameter = self
            .config
            .clamp_diameter(new.diameter.unwrap_or(self.config.default_diameter));
        let palette_len = self.config.palette_len();
        let color_index = new
            .color_index
            .filter(|i| *i < palette_len)
            .unwrap_or(self.config.default_color_index % palette_len);
        let label = new
            .label
            .unwrap_or_else(|| self.config.default_label.clone());

        self.tokens.push(Token {
            id,
            position,
            diameter,
            color_index,
            label,
            image_ref: new.image_ref,
        });
        self.touch();

        TokenPlacement {
            id,
            position,
            diameter,
        }
    }

    /// Begin dragging `id`. Rejected while fog editing or if the token is unknown.
    pub fn start_drag(&mut self, id: TokenId, fog_editing: bool) -> bool {
        if fog_editing || self.get(id).is_none() {
            return false;
        }
        self.dragging = Some(id);
        true
    }

    /// Move the dragged token by a screen-space delta at the given view scale
    pub fn update_drag(&mut self, screen_delta: Point, scale: f64) -> Option<TokenPlacement> {
        let id = self.dragging?;
        if !(scale > 0.0) || !screen_delta.is_finite() {
            return None;
        }
        let delta = screen_delta.divide(scale);
        let token = self.get_mut(id)?;
        token.position = token.position.add(&delta);
        let placement = TokenPlacement {
            id,
            position: token.position,
            diameter: token.diameter,
        };
        self.touch();
        Some(placement)
    }

    pub fn end_drag(&mut self) {
        self.dragging = None;
    }

    pub fn dragging(&self) -> Option<TokenId> {
        self.dragging
    }

    /// One wheel notch of resizing. Negative `wheel_delta` grows the token.
    pub fn resize(&mut self, id: TokenId, wheel_delta: f64) -> Option<f64> {
        if wheel_delta == 0.0 {
            return None;
        }
        let direction = if wheel_delta < 0.0 { 1.0 } else { -1.0 };
        let step = self.config.resize_step;
        let (min, max) = (self.config.min_diameter, self.config.max_diameter);
        let token = self.get_mut(id)?;
        token.diameter = (token.diameter + direction * step).clamp(min, max);
        let diameter = token.diameter;
        self.touch();
        Some(diameter)
    }

    pub fn cycle_color(&mut self, id: TokenId) -> Option<usize> {
        let palette_len = self.config.palette_len();
        let token = self.get_mut(id)?;
        token.color_index = next_color(token.color_index, palette_len);
        let index = token.color_index;
        self.touch();
        Some(index)
    }

    /// Rename a token; blank names are ignored
    pub fn rename(&mut self, id: TokenId, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() {
            return false;
        }
        let Some(token) = self.get_mut(id) else {
            return false;
        };
        token.label = label.to_string();
        self.touch();
        true
    }

    pub fn remove(&mut self, id: TokenId) -> Option<Token> {
        let index = self.tokens.iter().position(|t| t.id == id)?;
        if self.dragging == Some(id) {
            self.dragging = None;
        }
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        self.touch();
        Some(self.tokens.remove(index))
    }

    /// Drop every token; the clipboard survives
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.dragging = None;
        self.hovered = None;
        self.touch();
    }

    /// Topmost token under `point`
    pub fn hit_test(&self, point: &Point) -> Option<TokenId> {
        self.tokens.iter().rev().find(|t| t.contains(point)).map(|t| t.id)
    }

    pub fn hovered(&self) -> Option<TokenId> {
        self.hovered
    }

    /// Returns true when the hovered token changed
    pub fn set_hovered(&mut self, id: Option<TokenId>) -> bool {
        let changed = self.hovered != id;
        self.hovered = id;
        changed
    }

    /// Token a delete key applies to: the dragged one, else the hovered one
    pub fn delete_target(&self) -> Option<TokenId> {
        self.dragging.or(self.hovered)
    }

    pub fn copy(&mut self, id: TokenId) -> bool {
        match self.get(id).map(Token::template) {
            Some(template) => {
                self.clipboard = Some(template);
                true
            }
            None => false,
        }
    }

    pub fn clipboard(&self) -> Option<&TokenTemplate> {
        self.clipboard.as_ref()
    }

    pub fn paste(&mut self, at: Point) -> Option<TokenPlacement> {
        let new = NewToken::from_template(self.clipboard.as_ref()?, at);
        Some(self.create(new, at))
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(TokenConfig::default())
    }
}
