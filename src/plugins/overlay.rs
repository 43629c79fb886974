//! Ephemeral tactical annotations: ruler, directed effect line, burst marker.
//!
//! Nothing here is persisted. All points are in native map space so the
//! annotations follow the map through pan and zoom like tokens do.

use crate::core::config::OverlayConfig;
use crate::core::geo::Point;
use std::time::Instant;

/// A primitive for the presentation layer to draw
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayPrimitive {
    /// Ruler with its live distance label
    Measurement {
        start: Point,
        end: Point,
        label: String,
    },
    /// Directed effect line (cone, breath, bolt)
    EffectLine { start: Point, end: Point },
    /// One-shot marker
    Burst { at: Point },
}

/// Stroke being dragged out right now
#[derive(Debug, Clone, PartialEq)]
enum ActiveStroke {
    Measuring { start: Point, end: Point },
    Casting { start: Point, end: Point },
}

#[derive(Debug, Clone, PartialEq)]
struct Lingering {
    primitive: OverlayPrimitive,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct TacticalOverlay {
    config: OverlayConfig,
    active: Option<ActiveStroke>,
    lingering: Vec<Lingering>,
}

impl TacticalOverlay {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            active: None,
            lingering: Vec::new(),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// `pixelDistance / pixelsPerUnit`, one decimal, with the unit suffix
    pub fn distance_label(&self, start: &Point, end: &Point) -> String {
        let per_unit = if self.config.pixels_per_unit > 0.0 {
            self.config.pixels_per_unit
        } else {
            1.0
        };
        let units = start.distance_to(end) / per_unit;
        format!("{:.1} {}", units, self.config.unit_suffix)
    }

    pub fn start_measure(&mut self, at: Point) {
        self.active = Some(ActiveStroke::Measuring { start: at, end: at });
    }

    pub fn start_effect(&mut self, at: Point) {
        self.active = Some(ActiveStroke::Casting { start: at, end: at });
    }

    /// Move the free end of the active stroke
    pub fn update(&mut self, at: Point) -> bool {
        match &mut self.active {
            Some(ActiveStroke::Measuring { end, .. }) | Some(ActiveStroke::Casting { end, .. }) => {
                *end = at;
                true
            }
            None => false,
        }
    }

    /// Release the active stroke. The ruler vanishes at once; an effect
    /// line lingers for its configured lifetime.
    pub fn finish(&mut self, now: Instant) {
        if let Some(ActiveStroke::Casting { start, end }) = self.active.take() {
            self.lingering.push(Lingering {
                primitive: OverlayPrimitive::EffectLine { start, end },
                expires_at: now + self.config.effect_line_lifetime(),
            });
        }
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn burst(&mut self, at: Point, now: Instant) {
        self.lingering.push(Lingering {
            primitive: OverlayPrimitive::Burst { at },
            expires_at: now + self.config.burst_lifetime(),
        });
    }

    /// Drop expired primitives; returns how many were removed
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.lingering.len();
        self.lingering.retain(|l| l.expires_at > now);
        before - self.lingering.len()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn primitives(&self) -> Vec<OverlayPrimitive> {
        let mut out: Vec<OverlayPrimitive> =
            self.lingering.iter().map(|l| l.primitive.clone()).collect();
        match &self.active {
            Some(ActiveStroke::Measuring { start, end }) => {
                out.push(OverlayPrimitive::Measurement {
                    start: *start,
                    end: *end,
                    label: self.distance_label(start, end),
                });
            }
            Some(ActiveStroke::Casting { start, end }) => {
                out.push(OverlayPrimitive::EffectLine {
                    start: *start,
                    end: *end,
                });
            }
            None => {}
        }
        out
    }

    pub fn clear(&mut self) {
        self.active = None;
        self.lingering.clear();
    }
}

impl Default for TacticalOverlay {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}
