//! Engine-wide defaults taken from the tabletop tool's behaviour.
//! Keeping them in a single place makes it easier to tweak magic numbers;
//! everything here is only a default for the matching config field.

/// Smallest allowed viewport scale.
pub const MIN_SCALE: f64 = 0.1;

/// Largest allowed viewport scale.
pub const MAX_SCALE: f64 = 20.0;

/// Relative scale change per wheel notch.
pub const ZOOM_INTENSITY: f64 = 0.1;

/// Diameter of a freshly created token, in native map pixels.
pub const DEFAULT_TOKEN_DIAMETER: f64 = 60.0;

/// Lower token diameter bound.
pub const MIN_TOKEN_DIAMETER: f64 = 20.0;

/// Upper token diameter bound for the persisted variant.
pub const MAX_TOKEN_DIAMETER: f64 = 600.0;

/// Upper token diameter bound for the classic variant.
pub const CLASSIC_MAX_TOKEN_DIAMETER: f64 = 500.0;

/// Diameter change per wheel notch while resizing a token.
pub const TOKEN_RESIZE_STEP: f64 = 5.0;

/// Reveal radius as a multiple of the token diameter.
pub const REVEAL_MULTIPLIER: f64 = 1.5;

/// Manual fog brush radius in native map pixels.
pub const DEFAULT_BRUSH_SIZE: f64 = 60.0;

/// Border palette cycled by double click.
pub const DEFAULT_PALETTE: [&str; 6] = [
    "#2ecc71", "#e74c3c", "#3498db", "#f1c40f", "#9b59b6", "#ffffff",
];

/// Label used when a token has none (older scenes).
pub const DEFAULT_TOKEN_LABEL: &str = "Pawn";

/// Coordinate space assumed for token placement before any map is loaded.
pub const FALLBACK_MAP_SIZE: (u32, u32) = (800, 600);

/// Version string written into exported scenes.
pub const SCENE_VERSION: &str = "1.1";

/// Current `app_data` record schema.
pub const APP_DATA_SCHEMA: u32 = 2;

/// Effect line lifetime after release, in milliseconds.
pub const EFFECT_LINE_LIFETIME_MS: u64 = 5_000;

/// Burst marker lifetime, in milliseconds.
pub const BURST_LIFETIME_MS: u64 = 3_000;

/// Native pixels per measurement unit.
pub const PIXELS_PER_UNIT: f64 = 50.0;

/// Quiet period before the autosave worker flushes dirty slots.
pub const AUTOSAVE_DEBOUNCE_MS: u64 = 1_000;
