//! Server configuration.

use std::path::Path;

use gongzhu_cards::{DECKS_PER_SHOE, ScoreRules};
use serde::{Deserialize, Serialize};

use crate::ServerError;

/// Configuration for one table server process.
///
/// Loaded from a JSON file when a path is given on the command line;
/// every field falls back to its default when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen_addr: String,

    /// Configured deck count. Carried on the configuration surface for
    /// clients, but the shoe is currently always built from
    /// [`DECKS_PER_SHOE`] decks and does not consult this value.
    pub decks: usize,

    /// Scoring constants: base unit, exposure multiplier, catcher
    /// multiplier.
    pub rules: ScoreRules,

    /// Test-mode override: deal only this many cards per seat instead
    /// of the full shoe. `None` in normal play.
    pub test_hand_size: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:4710".to_string(),
            decks: DECKS_PER_SHOE,
            rules: ScoreRules::default(),
            test_hand_size: None,
        }
    }
}

impl ServerConfig {
    /// Loads a configuration file.
    ///
    /// # Errors
    /// Returns [`ServerError::Io`] if the file cannot be read and
    /// [`ServerError::Config`] if it is not valid JSON for this shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| ServerError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:4710");
        assert_eq!(config.decks, 2);
        assert_eq!(config.rules.base, 10);
        assert!(config.test_hand_size.is_none());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"listen_addr": "0.0.0.0:9000"}"#)
                .unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.rules.base, 10);
        assert_eq!(config.decks, 2);
    }

    #[test]
    fn test_full_json() {
        let config: ServerConfig = serde_json::from_str(
            r#"{
                "listen_addr": "0.0.0.0:9000",
                "decks": 3,
                "rules": {
                    "base": 5,
                    "exposure_multiplier": 2,
                    "catcher_multiplier": 3
                },
                "test_hand_size": 4
            }"#,
        )
        .unwrap();
        assert_eq!(config.decks, 3);
        assert_eq!(config.rules.base, 5);
        assert_eq!(config.rules.catcher_multiplier, 3);
        assert_eq!(config.test_hand_size, Some(4));
    }
}
