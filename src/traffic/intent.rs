//! Move intents and final moves
//!
//! A [`MoveIntent`] is one agent's request for the tick: where it is,
//! where it wants to be, how urgent that is, and which directions it
//! would accept instead. The resolver consumes the whole batch and
//! answers with one [`FinalMove`] per live agent.

use crate::core::types::{AgentId, Direction, Position};
use serde::{Deserialize, Serialize};

/// One agent's desired move for the current tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveIntent {
    pub agent_id: AgentId,
    pub current: Position,
    pub desired: Position,
    pub desired_direction: Direction,
    /// Processing priority; higher resolves first. See the associated
    /// tier constants.
    pub priority: i32,
    /// Fallback directions, best first, tried when the desired cell is
    /// already claimed.
    pub alternatives: Vec<Direction>,
}

impl MoveIntent {
    // Priority tiers, high to low. The resolver escalates within and
    // across these; the gaps leave room for the urgent cargo bonus
    // without crossing tier boundaries.

    /// Standing on a depot: must clear the cell before anything else.
    pub const ON_DEPOT_PRIORITY: i32 = 100;
    /// Urgent return already adjacent to a depot.
    pub const URGENT_NEAR_PRIORITY: i32 = 90;
    /// Urgent return still in the far field.
    pub const URGENT_PRIORITY: i32 = 80;
    /// Escaping a hostile while loaded.
    pub const FLEE_PRIORITY: i32 = 60;
    /// Chasing a rich hostile.
    pub const HUNT_PRIORITY: i32 = 55;
    /// Routine cargo return.
    pub const RETURN_PRIORITY: i32 = 50;
    /// Seeking richer ground.
    pub const EXPLORE_PRIORITY: i32 = 20;
    /// Extracting in place.
    pub const COLLECT_PRIORITY: i32 = 10;

    /// Intent to hold the current cell, with all cardinals as
    /// fallbacks in case the resolver needs to push the agent aside.
    pub fn stay(agent_id: AgentId, position: Position, priority: i32) -> Self {
        Self {
            agent_id,
            current: position,
            desired: position,
            desired_direction: Direction::Stay,
            priority,
            alternatives: Direction::CARDINALS.to_vec(),
        }
    }
}

/// The resolver's authoritative decision for one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalMove {
    pub agent_id: AgentId,
    pub direction: Direction,
}
