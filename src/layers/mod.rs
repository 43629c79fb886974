pub mod fog;
pub mod tokens;

pub use fog::{FogBuffer, FogLayer, FogOp, FogTool};
pub use tokens::{NewToken, Token, TokenId, TokenPlacement, TokenStore, TokenTemplate};
