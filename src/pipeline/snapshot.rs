//! Immutable world input for one tick
//!
//! The host builds one snapshot per tick; the whole pipeline runs to
//! completion against it before the next is taken. Nothing here is
//! mutated by the pipeline.

use crate::core::error::{GridlockError, Result};
use crate::core::types::{AgentState, HostileState, Position, Tick};
use crate::spatial::TorusGrid;
use ahash::AHashSet;

/// World state for one tick
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    pub grid: TorusGrid,
    /// Live agents under our control.
    pub agents: Vec<AgentState>,
    /// Hostile agents visible this tick.
    pub hostiles: Vec<HostileState>,
    /// Depot cells where cargo is banked.
    pub depots: Vec<Position>,
    pub tick: Tick,
    pub max_ticks: Tick,
}

impl WorldSnapshot {
    pub fn remaining_ticks(&self) -> Tick {
        self.max_ticks.saturating_sub(self.tick)
    }

    /// Reject snapshots the pipeline cannot plan against.
    pub fn validate(&self) -> Result<()> {
        if self.depots.is_empty() {
            return Err(GridlockError::NoDepots);
        }
        let mut seen = AHashSet::with_capacity(self.agents.len());
        for agent in &self.agents {
            if !seen.insert(agent.id) {
                return Err(GridlockError::DuplicateAgent(agent.id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AgentId;

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            grid: TorusGrid::new(8, 8).unwrap(),
            agents: vec![AgentState::new(AgentId(0), Position::new(1, 1), 0)],
            hostiles: vec![],
            depots: vec![Position::new(4, 4)],
            tick: 10,
            max_ticks: 400,
        }
    }

    #[test]
    fn test_valid_snapshot_accepted() {
        assert!(snapshot().validate().is_ok());
    }

    #[test]
    fn test_missing_depots_rejected() {
        let mut snap = snapshot();
        snap.depots.clear();
        assert!(matches!(snap.validate(), Err(GridlockError::NoDepots)));
    }

    #[test]
    fn test_duplicate_agents_rejected() {
        let mut snap = snapshot();
        snap.agents.push(AgentState::new(AgentId(0), Position::new(2, 2), 5));
        assert!(matches!(
            snap.validate(),
            Err(GridlockError::DuplicateAgent(AgentId(0)))
        ));
    }

    #[test]
    fn test_remaining_ticks_saturates() {
        let mut snap = snapshot();
        snap.tick = 500;
        assert_eq!(snap.remaining_ticks(), 0);
    }
}
