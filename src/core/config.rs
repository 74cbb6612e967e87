//! Pipeline tuning with documented constants
//!
//! Every threshold the controllers and the resolver consult lives here,
//! so one value governs all call sites. Hosts construct a config once,
//! validate it, and pass it by reference; there is no global state.

use crate::core::error::{GridlockError, Result};
use crate::core::types::Tick;
use serde::{Deserialize, Serialize};

/// Tuning for the decision pipeline and the traffic resolver
///
/// Defaults reproduce the tournament values the pipeline was tuned
/// with. Relative ordering between thresholds matters more than the
/// absolute numbers; `validate` rejects configs whose orderings are
/// broken.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    // === CARGO / MOVEMENT ===
    /// Maximum value an agent can carry.
    pub max_cargo: i32,

    /// An agent leaving a cell pays `cell resource / move_cost_ratio`.
    ///
    /// Agents that cannot pay are physically immobile for the tick and
    /// are forced to stay by the resolver regardless of priority.
    pub move_cost_ratio: i32,

    /// Fraction of a cell's resource extractable in one tick of
    /// collecting.
    pub extraction_ratio: i32,

    // === RETURN TRIGGERS ===
    /// Cargo fraction of `max_cargo` at which an agent turns home.
    pub fill_threshold: f32,

    /// Extra ticks of margin on the urgent-return trigger.
    ///
    /// An agent flips to urgent return once
    /// `remaining ticks < depot distance + safe_return_margin`.
    /// The margin absorbs traffic jams near depots; failing to arrive
    /// forfeits the whole cargo.
    pub safe_return_margin: i32,

    /// Multiple of the baseline extraction rate that the projected
    /// at-depot rate (`cargo / (distance + 1)`) must exceed for a
    /// partially loaded agent to head home early.
    pub return_rate_multiplier: f32,

    /// Depot radius inside which a moderately loaded agent banks
    /// opportunistically.
    pub smart_return_radius: i32,

    /// Cargo fraction counting as "moderately loaded" for the
    /// smart-early return. Must stay below `fill_threshold` so the
    /// full-cargo trigger keeps precedence.
    pub smart_return_fill: f32,

    // === CELL VALUATION ===
    /// Cell resource fraction of `max_cargo` below which a cell is
    /// treated as empty when exploring.
    pub low_cell_threshold: f32,

    // === FLEE ===
    /// Radius of the hostile scan that can trigger fleeing.
    pub flee_threat_radius: i32,

    /// Minimum cargo before a threat is worth running from.
    pub flee_min_cargo: i32,

    // === HUNT ===
    /// Radius of the rich-hostile scan in the early and mid game.
    pub hunt_radius: i32,

    /// Tighter hunt radius once the match reaches its late phase.
    pub hunt_radius_late: i32,

    /// Maximum own cargo for an agent to be light enough to hunt.
    pub hunt_max_own_cargo: i32,

    /// Minimum hostile cargo for a chase to be worth the detour.
    pub hunt_min_target_cargo: i32,

    /// Radius around a hunt target scanned for escorting defenders.
    pub hunt_defender_radius: i32,

    /// Maximum cargo for a hostile to count as a credible defender.
    pub defender_max_cargo: i32,

    // === EXPLORATION ===
    /// Radius of the cross-shaped scan that scores candidate
    /// exploration clusters.
    pub cluster_radius: i32,

    // === RESOLVER ===
    /// Depot distance at or below which an urgent return is escalated
    /// to the near-depot sub-tier, so congestion at the mouth of a
    /// depot resolves before far-field urgency.
    pub urgent_near_distance: i32,

    /// Remaining-tick window in which collisions on depot cells are
    /// permitted: arrivals bank their cargo and stack.
    pub endgame_collision_window: Tick,

    // === PHASES ===
    /// Tick fraction at which the mid game begins.
    pub phase_mid: f32,

    /// Tick fraction at which the late game begins.
    pub phase_late: f32,

    /// Tick fraction at which the end game begins.
    pub phase_endgame: f32,

    // === PARALLELIZATION ===
    /// Minimum live-agent count before intent generation fans out
    /// across threads. Below this, thread overhead exceeds the win.
    pub parallel_threshold: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            // Cargo / movement
            max_cargo: 1000,
            move_cost_ratio: 10,
            extraction_ratio: 4,

            // Return triggers
            fill_threshold: 0.9,
            safe_return_margin: 25,
            return_rate_multiplier: 2.0,
            smart_return_radius: 4,
            smart_return_fill: 0.5,

            // Cell valuation
            low_cell_threshold: 0.1,

            // Flee
            flee_threat_radius: 2,
            flee_min_cargo: 300,

            // Hunt
            hunt_radius: 6,
            hunt_radius_late: 3,
            hunt_max_own_cargo: 200,
            hunt_min_target_cargo: 700,
            hunt_defender_radius: 2,
            defender_max_cargo: 200,

            // Exploration
            cluster_radius: 1,

            // Resolver
            urgent_near_distance: 2,
            endgame_collision_window: 2,

            // Phases (fractions of the match)
            phase_mid: 0.30,
            phase_late: 0.60,
            phase_endgame: 0.90,

            // Parallelization
            parallel_threshold: 1000,
        }
    }
}

impl BotConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text, then validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_cargo <= 0 {
            return Err(GridlockError::InvalidConfig(format!(
                "max_cargo ({}) must be positive",
                self.max_cargo
            )));
        }

        if self.move_cost_ratio <= 0 || self.extraction_ratio <= 0 {
            return Err(GridlockError::InvalidConfig(
                "move_cost_ratio and extraction_ratio must be positive".into(),
            ));
        }

        // The smart-early trigger is deliberately the weaker one; if it
        // reached the full-cargo threshold the 0.6-scored transition
        // would shadow the 1.0-scored one for identical loads.
        if self.smart_return_fill >= self.fill_threshold {
            return Err(GridlockError::InvalidConfig(format!(
                "smart_return_fill ({}) must be < fill_threshold ({})",
                self.smart_return_fill, self.fill_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.fill_threshold)
            || !(0.0..=1.0).contains(&self.low_cell_threshold)
        {
            return Err(GridlockError::InvalidConfig(
                "cargo and cell thresholds must lie in [0, 1]".into(),
            ));
        }

        if !(self.phase_mid < self.phase_late && self.phase_late < self.phase_endgame) {
            return Err(GridlockError::InvalidConfig(format!(
                "phase thresholds must be ascending: {} / {} / {}",
                self.phase_mid, self.phase_late, self.phase_endgame
            )));
        }

        if self.hunt_radius <= 0 || self.hunt_radius_late <= 0 || self.flee_threat_radius <= 0 {
            return Err(GridlockError::InvalidConfig(
                "scan radii must be positive".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BotConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_fill_thresholds() {
        let config = BotConfig {
            smart_return_fill: 0.95,
            ..BotConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unordered_phases() {
        let config = BotConfig {
            phase_late: 0.2,
            ..BotConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_cargo() {
        let config = BotConfig {
            max_cargo: 0,
            ..BotConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_overrides_defaults() {
        let config = BotConfig::from_toml_str("safe_return_margin = 15\nhunt_radius = 8\n")
            .expect("partial toml should parse against defaults");
        assert_eq!(config.safe_return_margin, 15);
        assert_eq!(config.hunt_radius, 8);
        assert_eq!(config.max_cargo, 1000);
    }

    #[test]
    fn test_toml_rejects_invalid_values() {
        assert!(BotConfig::from_toml_str("max_cargo = -5\n").is_err());
    }
}
