pub mod overlay;

pub use overlay::{OverlayPrimitive, TacticalOverlay};
