//! Per-tick derived observations
//!
//! Everything the transition predicates and behaviors consult beyond
//! the raw snapshot lives in [`TickSignals`], computed once per tick
//! and shared by every agent; grid-wide scans are never repeated per
//! agent. The [`SignalProvider`] trait is the seam where a host plugs
//! in its own heatmaps, threat models, or target assignment; the
//! built-in [`GridScanProvider`] keeps the pipeline total without one.

use crate::core::config::BotConfig;
use crate::core::types::{AgentId, GamePhase, Position};
use crate::pipeline::snapshot::WorldSnapshot;
use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;

/// Observations for one agent, valid for one tick
#[derive(Debug, Clone)]
pub struct AgentSignals {
    /// A hostile worth running from is inside the threat radius.
    pub threat_nearby: bool,
    /// Position of the closest such hostile.
    pub threat_from: Option<Position>,
    /// A rich, poorly defended hostile worth chasing.
    pub hunt_target: Option<Position>,
    /// Destination the explore behavior should head for.
    pub explore_target: Position,
    /// Value extractable from the current cell this tick.
    pub marginal_yield: i32,
    /// Trailing per-tick value of working an average cell; the bar a
    /// cell or a return trip has to clear.
    pub baseline_rate: f32,
}

/// All signals for one tick
#[derive(Debug, Clone)]
pub struct TickSignals {
    pub phase: GamePhase,
    pub average_resource: f32,
    /// Agents that cannot pay this tick's move cost.
    pub immobile: AHashSet<AgentId>,
    /// Cells held by immobile agents; navigation steers around them.
    pub blocked_cells: AHashSet<Position>,
    pub per_agent: AHashMap<AgentId, AgentSignals>,
}

/// Producer of per-tick signals
///
/// Implementations must be total: a signals entry for every live
/// agent, every tick.
pub trait SignalProvider: Send + Sync {
    fn compute(&self, snapshot: &WorldSnapshot, config: &BotConfig) -> TickSignals;
}

/// Match phase from the tick fraction.
pub fn phase_of(tick: u64, max_ticks: u64, config: &BotConfig) -> GamePhase {
    if max_ticks == 0 {
        return GamePhase::Endgame;
    }
    let fraction = tick as f32 / max_ticks as f32;
    if fraction >= config.phase_endgame {
        GamePhase::Endgame
    } else if fraction >= config.phase_late {
        GamePhase::Late
    } else if fraction >= config.phase_mid {
        GamePhase::Mid
    } else {
        GamePhase::Early
    }
}

/// Built-in provider scanning the snapshot directly
///
/// One pass over the grid finds the richest cluster (resource summed
/// in a cross of `cluster_radius`), shared by every agent as the
/// explore target. Threat and hunt scans walk the hostile roster per
/// agent; hunt candidates are ranked by value density (cargo per step
/// of distance) and disqualified when escorted by more than one
/// credible defender.
#[derive(Debug, Default, Clone, Copy)]
pub struct GridScanProvider;

impl GridScanProvider {
    pub fn new() -> Self {
        Self
    }
}

impl SignalProvider for GridScanProvider {
    fn compute(&self, snapshot: &WorldSnapshot, config: &BotConfig) -> TickSignals {
        let grid = &snapshot.grid;
        let cell_count = (grid.width() * grid.height()) as f32;
        let total: i64 = grid.positions().map(|p| i64::from(grid.at(p).resource)).sum();
        let average_resource = total as f32 / cell_count;
        let baseline_rate = average_resource / config.extraction_ratio as f32;

        let phase = phase_of(snapshot.tick, snapshot.max_ticks, config);

        let mut immobile = AHashSet::new();
        let mut blocked_cells = AHashSet::new();
        for agent in &snapshot.agents {
            if agent.cargo < grid.move_cost(agent.position, config.move_cost_ratio) {
                immobile.insert(agent.id);
                blocked_cells.insert(grid.normalize(agent.position));
            }
        }

        // One grid-wide scan; every agent shares the same cluster
        // target. Host providers can assign per-agent targets instead.
        let best_cluster = grid
            .positions()
            .fold(None::<(Position, i64)>, |best, pos| {
                let score = grid.sum_in_radius(pos, config.cluster_radius);
                match best {
                    Some((_, top)) if top >= score => best,
                    _ => Some((pos, score)),
                }
            })
            .map(|(pos, _)| pos)
            .unwrap_or(Position::new(0, 0));

        let hunt_radius = if phase >= GamePhase::Late {
            config.hunt_radius_late
        } else {
            config.hunt_radius
        };

        let per_agent = snapshot
            .agents
            .iter()
            .map(|agent| {
                let threat_from = snapshot
                    .hostiles
                    .iter()
                    .filter(|h| {
                        h.cargo < agent.cargo
                            && grid.distance(agent.position, h.position)
                                <= config.flee_threat_radius
                    })
                    .min_by_key(|h| grid.distance(agent.position, h.position))
                    .map(|h| grid.normalize(h.position));

                let hunt_target = snapshot
                    .hostiles
                    .iter()
                    .filter(|h| {
                        h.cargo >= config.hunt_min_target_cargo
                            && grid.distance(agent.position, h.position) <= hunt_radius
                    })
                    .filter(|target| {
                        let defenders = snapshot
                            .hostiles
                            .iter()
                            .filter(|other| {
                                other.cargo <= config.defender_max_cargo
                                    && grid.distance(target.position, other.position)
                                        <= config.hunt_defender_radius
                            })
                            .count();
                        defenders <= 1
                    })
                    .max_by_key(|h| {
                        let distance = grid.distance(agent.position, h.position);
                        OrderedFloat(h.cargo as f32 / (distance + 1) as f32)
                    })
                    .map(|h| grid.normalize(h.position));

                let signals = AgentSignals {
                    threat_nearby: threat_from.is_some(),
                    threat_from,
                    hunt_target,
                    explore_target: best_cluster,
                    marginal_yield: grid.at(agent.position).resource / config.extraction_ratio,
                    baseline_rate,
                };
                (agent.id, signals)
            })
            .collect();

        TickSignals {
            phase,
            average_resource,
            immobile,
            blocked_cells,
            per_agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AgentState, HostileState};
    use crate::spatial::TorusGrid;

    fn snapshot_with(
        agents: Vec<AgentState>,
        hostiles: Vec<HostileState>,
        resources: &[(i32, i32, i32)],
        tick: u64,
    ) -> WorldSnapshot {
        let mut grid = TorusGrid::new(16, 16).unwrap();
        for &(x, y, r) in resources {
            grid.at_mut(Position::new(x, y)).resource = r;
        }
        WorldSnapshot {
            grid,
            agents,
            hostiles,
            depots: vec![Position::new(0, 0)],
            tick,
            max_ticks: 400,
        }
    }

    #[test]
    fn test_phase_thresholds() {
        let config = BotConfig::default();
        assert_eq!(phase_of(0, 400, &config), GamePhase::Early);
        assert_eq!(phase_of(120, 400, &config), GamePhase::Mid);
        assert_eq!(phase_of(240, 400, &config), GamePhase::Late);
        assert_eq!(phase_of(360, 400, &config), GamePhase::Endgame);
        assert_eq!(phase_of(5, 0, &config), GamePhase::Endgame);
    }

    #[test]
    fn test_immobile_agents_detected_and_cells_blocked() {
        let agents = vec![
            AgentState::new(AgentId(0), Position::new(2, 2), 3),
            AgentState::new(AgentId(1), Position::new(5, 5), 500),
        ];
        // Cell (2,2) costs 40/10 = 4 to leave; agent 0 holds 3.
        let snapshot = snapshot_with(agents, vec![], &[(2, 2, 40), (5, 5, 40)], 10);
        let signals = GridScanProvider.compute(&snapshot, &BotConfig::default());

        assert!(signals.immobile.contains(&AgentId(0)));
        assert!(!signals.immobile.contains(&AgentId(1)));
        assert!(signals.blocked_cells.contains(&Position::new(2, 2)));
    }

    #[test]
    fn test_threat_requires_lighter_hostile_in_radius() {
        let agents = vec![AgentState::new(AgentId(0), Position::new(4, 4), 600)];
        let hostiles = vec![
            HostileState {
                position: Position::new(5, 4),
                cargo: 100,
            },
            // Heavier than us: not a threat.
            HostileState {
                position: Position::new(4, 5),
                cargo: 900,
            },
        ];
        let snapshot = snapshot_with(agents, hostiles, &[], 10);
        let signals = GridScanProvider.compute(&snapshot, &BotConfig::default());
        let agent = &signals.per_agent[&AgentId(0)];

        assert!(agent.threat_nearby);
        assert_eq!(agent.threat_from, Some(Position::new(5, 4)));
    }

    #[test]
    fn test_hunt_ignores_escorted_targets() {
        let agents = vec![AgentState::new(AgentId(0), Position::new(4, 4), 50)];
        let hostiles = vec![
            HostileState {
                position: Position::new(7, 4),
                cargo: 800,
            },
            // Two light escorts around the rich target.
            HostileState {
                position: Position::new(7, 5),
                cargo: 50,
            },
            HostileState {
                position: Position::new(7, 3),
                cargo: 50,
            },
        ];
        let snapshot = snapshot_with(agents, hostiles, &[], 10);
        let signals = GridScanProvider.compute(&snapshot, &BotConfig::default());
        assert_eq!(signals.per_agent[&AgentId(0)].hunt_target, None);
    }

    #[test]
    fn test_hunt_finds_undefended_rich_target() {
        let agents = vec![AgentState::new(AgentId(0), Position::new(4, 4), 50)];
        let hostiles = vec![HostileState {
            position: Position::new(7, 4),
            cargo: 800,
        }];
        let snapshot = snapshot_with(agents, hostiles, &[], 10);
        let signals = GridScanProvider.compute(&snapshot, &BotConfig::default());
        assert_eq!(
            signals.per_agent[&AgentId(0)].hunt_target,
            Some(Position::new(7, 4))
        );
    }

    #[test]
    fn test_hunt_radius_tightens_late_game() {
        let agents = vec![AgentState::new(AgentId(0), Position::new(4, 4), 50)];
        let hostiles = vec![HostileState {
            position: Position::new(9, 4), // distance 5
            cargo: 800,
        }];
        // Mid game: radius 6 reaches it.
        let snapshot = snapshot_with(agents.clone(), hostiles.clone(), &[], 150);
        let signals = GridScanProvider.compute(&snapshot, &BotConfig::default());
        assert!(signals.per_agent[&AgentId(0)].hunt_target.is_some());

        // Late game: radius 3 does not.
        let snapshot = snapshot_with(agents, hostiles, &[], 280);
        let signals = GridScanProvider.compute(&snapshot, &BotConfig::default());
        assert!(signals.per_agent[&AgentId(0)].hunt_target.is_none());
    }

    #[test]
    fn test_explore_target_is_richest_cluster() {
        let agents = vec![AgentState::new(AgentId(0), Position::new(0, 0), 0)];
        let resources = [(10, 10, 500), (10, 11, 400), (3, 3, 100)];
        let snapshot = snapshot_with(agents, vec![], &resources, 10);
        let signals = GridScanProvider.compute(&snapshot, &BotConfig::default());
        let target = signals.per_agent[&AgentId(0)].explore_target;
        // The two-cell pile around (10,10)/(10,11) beats the lone 100.
        assert!(target == Position::new(10, 10) || target == Position::new(10, 11));
    }
}
