pub mod events;
pub mod handler;
pub mod interaction;

// Re-export the essential types
pub use events::{EventHandled, InputEvent, KeyCode, KeyModifiers, MouseButton};
pub use interaction::InteractionState;
