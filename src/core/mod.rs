pub mod config;
pub mod constants;
pub mod geo;
pub mod mapper;
pub mod session;
pub mod viewport;

// Re-export commonly used types
pub use config::{ConfigProfile, ResizeBinding, SessionConfig};
pub use geo::{Point, ScreenRect, Size};
pub use mapper::CoordinateMapper;
pub use session::Session;
pub use viewport::{ViewState, ViewportController};
