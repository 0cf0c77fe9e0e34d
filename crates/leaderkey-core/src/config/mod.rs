// Leaderkey Config
// TOML sequence configuration loaded at start-up

pub mod parser;

pub use parser::{Config, ConfigError, LeaderConfig, DEFAULT_TIMEOUT_MS};
