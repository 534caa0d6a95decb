// Data-driven match configuration.
//
// Every tunable the session and resolver read lives in `MatchConfig`: health,
// the per-round move bounds, the round cap, playback and selection timers,
// display names, and the outcome table itself. It loads from JSON with every
// field optional (missing fields take the defaults below), so a balance file
// can carry just an `outcomes` list.
//
// Loading validates bounds and reports outcome-table gaps with `warn!`: a
// missing pair silently resolves to zero damage at play time, which is
// usually a balance mistake rather than intent.
//
// Both participants should run identical configs. Nothing enforces that over
// the wire; with a non-symmetric table the two sides will disagree on health.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::outcome::OutcomeTable;

/// Upper bound on `max_moves`. A round's list has to fit in one relay frame.
pub const MAX_MOVES_PER_ROUND: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Starting (and maximum) health for both players.
    pub max_health: u32,
    /// Fewest moves a round can ask for.
    pub min_moves: usize,
    /// Most moves a round can ask for.
    pub max_moves: usize,
    /// The match ends after this many rounds even if both players stand.
    pub max_rounds: u32,
    /// How long each revealed step stays current during playback.
    pub step_delay_ms: u64,
    /// Time allowed to pick moves before the partial list is submitted.
    pub selection_time_ms: u64,
    pub player_name: String,
    pub opponent_name: String,
    pub outcomes: OutcomeTable,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            min_moves: 2,
            max_moves: 6,
            max_rounds: 3,
            step_delay_ms: 800,
            selection_time_ms: 10_000,
            player_name: "You".into(),
            opponent_name: "Opponent".into(),
            outcomes: OutcomeTable::standard(),
        }
    }
}

impl MatchConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = serde_json::from_str(json)?;
        config.validate()?;
        config.report_outcome_gaps();
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_moves == 0 {
            return Err(ConfigError::Invalid("min_moves must be at least 1".into()));
        }
        if self.min_moves > self.max_moves {
            return Err(ConfigError::Invalid(format!(
                "min_moves ({}) exceeds max_moves ({})",
                self.min_moves, self.max_moves
            )));
        }
        if self.max_moves > MAX_MOVES_PER_ROUND {
            return Err(ConfigError::Invalid(format!(
                "max_moves ({}) exceeds the limit of {MAX_MOVES_PER_ROUND}",
                self.max_moves
            )));
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid("max_rounds must be at least 1".into()));
        }
        if self.max_health == 0 {
            return Err(ConfigError::Invalid("max_health must be positive".into()));
        }
        Ok(())
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn selection_time(&self) -> Duration {
        Duration::from_millis(self.selection_time_ms)
    }

    fn report_outcome_gaps(&self) {
        let missing = self.outcomes.missing_pairs();
        if missing.is_empty() {
            return;
        }
        warn!(
            count = missing.len(),
            "outcome table has gaps; these pairs will deal no damage"
        );
        for (local, peer) in missing {
            warn!(%local, %peer, "no outcome entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::moves::Move;
    use crate::outcome::Damage;

    #[test]
    fn default_is_valid() {
        let config = MatchConfig::default();
        config.validate().unwrap();
        assert_eq!(config.step_delay(), Duration::from_millis(800));
        assert_eq!(config.selection_time(), Duration::from_secs(10));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = MatchConfig::from_json(r#"{"max_rounds": 5, "max_health": 60}"#).unwrap();
        assert_eq!(config.max_rounds, 5);
        assert_eq!(config.max_health, 60);
        assert_eq!(config.min_moves, 2);
        assert_eq!(config.outcomes, OutcomeTable::standard());
    }

    #[test]
    fn outcomes_replace_the_standard_table() {
        let json = r#"{"outcomes": [
            {"local": "Attack Left", "peer": "Attack Left", "damage_to_local": 2, "damage_to_peer": 8}
        ]}"#;
        let config = MatchConfig::from_json(json).unwrap();
        assert_eq!(config.outcomes.len(), 1);
        assert_eq!(
            config.outcomes.outcome(Move::AttackLeft, Move::AttackLeft),
            Damage::new(2, 8)
        );
    }

    #[test]
    fn inverted_move_bounds_rejected() {
        let err = MatchConfig::from_json(r#"{"min_moves": 5, "max_moves": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
    }

    #[test]
    fn oversized_max_moves_rejected() {
        let err = MatchConfig::from_json(r#"{"min_moves": 1, "max_moves": 18446744073709551615}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");

        let at_limit = MatchConfig {
            max_moves: MAX_MOVES_PER_ROUND,
            ..MatchConfig::default()
        };
        at_limit.validate().unwrap();
    }

    #[test]
    fn zero_rounds_rejected() {
        let err = MatchConfig::from_json(r#"{"max_rounds": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_rejected() {
        let err = MatchConfig::from_json("{max_rounds: 3").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"step_delay_ms": 250, "player_name": "Ada"}}"#).unwrap();
        let config = MatchConfig::load(file.path()).unwrap();
        assert_eq!(config.step_delay_ms, 250);
        assert_eq!(config.player_name, "Ada");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = MatchConfig::load("/definitely/not/here/parry.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
