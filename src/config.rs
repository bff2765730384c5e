//! Server configuration from environment variables

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port for the websocket listener
    pub port: u16,
    /// Rounds per game, fixed at game start for every new room
    pub max_rounds: u32,
}

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_MAX_ROUNDS: u32 = 5;

impl Config {
    /// Load config from WHOTEXTED_PORT and WHOTEXTED_MAX_ROUNDS,
    /// falling back to defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let port = std::env::var("WHOTEXTED_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let max_rounds = std::env::var("WHOTEXTED_MAX_ROUNDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_ROUNDS);

        Self { port, max_rounds }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}
