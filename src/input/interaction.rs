use crate::core::geo::Point;
use crate::layers::tokens::TokenId;

/// The one gesture in progress.
///
/// Exactly one variant is active at a time, so gestures cannot interfere
/// with each other; pointer-up always returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Panning,
    DraggingToken {
        id: TokenId,
        /// Last pointer position, for per-move screen deltas
        last: Point,
    },
    DrawingFog,
    Measuring,
    CastingEffect,
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn dragged_token(&self) -> Option<TokenId> {
        match self {
            InteractionState::DraggingToken { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Panning => "panning",
            InteractionState::DraggingToken { .. } => "dragging_token",
            InteractionState::DrawingFog => "drawing_fog",
            InteractionState::Measuring => "measuring",
            InteractionState::CastingEffect => "casting_effect",
        }
    }
}
