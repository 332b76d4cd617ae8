pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, LlmSettings, RateLimitConfig};
pub use error::{CommandError, EngineError, Result};
pub use types::{CommandSource, CommandType, EntityId, GameMode};
