//! Per-tick orchestration
//!
//! One call per tick: sync controllers with the live set, compute
//! signals once, let every controller evaluate and behave, then hand
//! the whole batch of intents to the traffic resolver. Intent
//! generation shares no mutable state between agents, so above a
//! configurable population it fans out across threads; resolution is
//! always serialized because claims are priority-order dependent.

pub mod snapshot;

pub use snapshot::WorldSnapshot;

use crate::agent::behavior::{DepotContext, IntentBuilders};
use crate::agent::controller::{AgentController, ControlContext};
use crate::core::config::BotConfig;
use crate::core::error::{GridlockError, Result};
use crate::core::types::{AgentId, AgentState, Direction, Position, Tick};
use crate::signals::{GridScanProvider, SignalProvider, TickSignals};
use crate::traffic::resolver::TrafficContext;
use crate::traffic::{resolve, FinalMove, MoveIntent};
use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;

/// Counters from one tick, for logs and host dashboards
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    /// Live agents planned for.
    pub agents: usize,
    /// Controllers that changed state this tick.
    pub state_changes: usize,
    /// Agents that wanted to move but were resolved to stay.
    pub forced_stays: usize,
    /// Extra arrivals stacked on depot cells in the end-game window.
    pub endgame_exemptions: usize,
    /// Controllers created for newly appeared agents.
    pub controllers_created: usize,
    /// Controllers dropped for departed agents.
    pub controllers_dropped: usize,
}

/// One tick's plan plus its report
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub moves: Vec<FinalMove>,
    pub report: TickReport,
}

/// The per-tick decision pipeline
///
/// Owns the per-agent controllers and the pluggable signal provider
/// and intent builders. Everything else arrives by reference each
/// tick.
pub struct TickPipeline {
    config: BotConfig,
    controllers: AHashMap<AgentId, AgentController>,
    provider: Box<dyn SignalProvider>,
    builders: IntentBuilders,
}

impl TickPipeline {
    /// Build a pipeline with the built-in provider and behaviors.
    ///
    /// Validates the config up front; a broken config never produces a
    /// half-working pipeline.
    pub fn new(config: BotConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            controllers: AHashMap::new(),
            provider: Box::new(GridScanProvider::new()),
            builders: IntentBuilders::standard(),
        })
    }

    /// Swap in a host signal provider (heatmaps, threat models,
    /// per-agent target assignment).
    pub fn with_provider(mut self, provider: Box<dyn SignalProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Swap in host intent builders.
    pub fn with_builders(mut self, builders: IntentBuilders) -> Self {
        self.builders = builders;
        self
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// Current state name of one agent's controller, if it is live.
    pub fn state_of(&self, id: AgentId) -> Option<&'static str> {
        self.controllers.get(&id).map(AgentController::state_name)
    }

    /// Create controllers for new agents, drop the departed.
    fn sync_controllers(&mut self, agents: &[AgentState]) -> (usize, usize) {
        let live: AHashSet<AgentId> = agents.iter().map(|a| a.id).collect();
        let before = self.controllers.len();
        self.controllers.retain(|id, _| live.contains(id));
        let dropped = before - self.controllers.len();

        let mut created = 0;
        for agent in agents {
            self.controllers.entry(agent.id).or_insert_with(|| {
                created += 1;
                AgentController::new()
            });
        }
        (created, dropped)
    }

    /// Plan one tick against an immutable snapshot.
    pub fn run_tick(&mut self, snapshot: &WorldSnapshot) -> Result<TickOutcome> {
        snapshot.validate()?;
        let (created, dropped) = self.sync_controllers(&snapshot.agents);
        let signals = self.provider.compute(snapshot, &self.config);
        let remaining = snapshot.remaining_ticks();

        // Ascending agent id fixes the processing order regardless of
        // snapshot or map iteration order.
        let mut agents: Vec<&AgentState> = snapshot.agents.iter().collect();
        agents.sort_by_key(|a| a.id);

        let config = &self.config;
        let builders = &self.builders;
        let mut controllers: Vec<(AgentId, &mut AgentController)> = self
            .controllers
            .iter_mut()
            .map(|(id, controller)| (*id, controller))
            .collect();
        controllers.sort_by_key(|(id, _)| *id);

        // After sync the two id sets are identical, so the sorted
        // sequences pair up one to one.
        let jobs: Vec<(&AgentState, &mut AgentController)> = agents
            .into_iter()
            .zip(controllers.into_iter().map(|(_, c)| c))
            .collect();

        let run = |(agent, controller): (&AgentState, &mut AgentController)| {
            step_controller(
                agent, controller, snapshot, &signals, config, builders, remaining,
            )
        };

        let steps: Result<Vec<(MoveIntent, bool)>> =
            if jobs.len() >= self.config.parallel_threshold {
                jobs.into_par_iter().map(run).collect()
            } else {
                jobs.into_iter().map(run).collect()
            };
        let steps = steps?;

        let state_changes = steps.iter().filter(|(_, changed)| *changed).count();
        let intents: Vec<MoveIntent> = steps.into_iter().map(|(intent, _)| intent).collect();

        let traffic = TrafficContext {
            grid: &snapshot.grid,
            depots: &snapshot.depots,
            agents: &snapshot.agents,
            remaining_ticks: remaining,
            immobile: &signals.immobile,
        };
        let moves = resolve(&intents, &traffic, &self.config)?;

        let report = build_report(
            &intents, &moves, snapshot, &self.config, remaining, state_changes, created, dropped,
        );
        tracing::debug!(
            agents = report.agents,
            state_changes = report.state_changes,
            forced_stays = report.forced_stays,
            tick = snapshot.tick,
            "tick planned"
        );

        Ok(TickOutcome { moves, report })
    }
}

fn step_controller(
    agent: &AgentState,
    controller: &mut AgentController,
    snapshot: &WorldSnapshot,
    signals: &TickSignals,
    config: &BotConfig,
    builders: &IntentBuilders,
    remaining: Tick,
) -> Result<(MoveIntent, bool)> {
    let agent_signals = signals
        .per_agent
        .get(&agent.id)
        .ok_or(GridlockError::MissingSignals(agent.id))?;
    let nearest = snapshot
        .grid
        .closest(agent.position, &snapshot.depots)
        .ok_or(GridlockError::NoDepots)?;

    let mut ctx = ControlContext {
        agent,
        grid: &snapshot.grid,
        depot: DepotContext {
            positions: &snapshot.depots,
            nearest,
            distance: snapshot.grid.distance(agent.position, nearest),
        },
        remaining_ticks: remaining,
        config,
        signals: agent_signals,
        blocked: &signals.blocked_cells,
        builders,
        intent: None,
    };
    let step = controller.update(&mut ctx)?;
    Ok((step.intent, step.changed))
}

#[allow(clippy::too_many_arguments)]
fn build_report(
    intents: &[MoveIntent],
    moves: &[FinalMove],
    snapshot: &WorldSnapshot,
    config: &BotConfig,
    remaining: Tick,
    state_changes: usize,
    created: usize,
    dropped: usize,
) -> TickReport {
    let forced_stays = intents
        .iter()
        .zip(moves)
        .filter(|(intent, mv)| {
            intent.desired_direction != Direction::Stay && mv.direction == Direction::Stay
        })
        .count();

    let mut endgame_exemptions = 0;
    if remaining <= config.endgame_collision_window {
        let grid = &snapshot.grid;
        let depot_cells: AHashSet<Position> =
            snapshot.depots.iter().map(|&d| grid.normalize(d)).collect();
        let mut landings: AHashMap<Position, usize> = AHashMap::new();
        for (intent, mv) in intents.iter().zip(moves) {
            let cell = grid.offset(intent.current, mv.direction);
            if depot_cells.contains(&cell) {
                *landings.entry(cell).or_insert(0) += 1;
            }
        }
        endgame_exemptions = landings.values().filter(|&&n| n > 1).map(|n| n - 1).sum();
    }

    TickReport {
        agents: moves.len(),
        state_changes,
        forced_stays,
        endgame_exemptions,
        controllers_created: created,
        controllers_dropped: dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AgentId;
    use crate::spatial::TorusGrid;

    fn snapshot(agents: Vec<AgentState>) -> WorldSnapshot {
        WorldSnapshot {
            grid: TorusGrid::new(16, 16).unwrap(),
            agents,
            hostiles: vec![],
            depots: vec![Position::new(0, 0)],
            tick: 10,
            max_ticks: 400,
        }
    }

    #[test]
    fn test_controller_lifecycle_follows_live_set() {
        let mut pipeline = TickPipeline::new(BotConfig::default()).unwrap();
        let snap = snapshot(vec![
            AgentState::new(AgentId(0), Position::new(4, 4), 0),
            AgentState::new(AgentId(1), Position::new(8, 8), 0),
        ]);
        let outcome = pipeline.run_tick(&snap).unwrap();
        assert_eq!(pipeline.controller_count(), 2);
        assert_eq!(outcome.report.controllers_created, 2);

        // Agent 1 disappears, agent 2 appears.
        let snap = snapshot(vec![
            AgentState::new(AgentId(0), Position::new(4, 4), 0),
            AgentState::new(AgentId(2), Position::new(9, 9), 0),
        ]);
        let outcome = pipeline.run_tick(&snap).unwrap();
        assert_eq!(pipeline.controller_count(), 2);
        assert_eq!(outcome.report.controllers_created, 1);
        assert_eq!(outcome.report.controllers_dropped, 1);
        assert!(pipeline.state_of(AgentId(1)).is_none());
        assert!(pipeline.state_of(AgentId(2)).is_some());
    }

    #[test]
    fn test_one_move_per_agent() {
        let mut pipeline = TickPipeline::new(BotConfig::default()).unwrap();
        let agents: Vec<AgentState> = (0..12)
            .map(|i| AgentState::new(AgentId(i), Position::new(i as i32, 5), 0))
            .collect();
        let outcome = pipeline.run_tick(&snapshot(agents)).unwrap();
        assert_eq!(outcome.moves.len(), 12);
        let ids: AHashSet<AgentId> = outcome.moves.iter().map(|m| m.agent_id).collect();
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn test_invalid_snapshot_aborts_whole_tick() {
        let mut pipeline = TickPipeline::new(BotConfig::default()).unwrap();
        let mut snap = snapshot(vec![AgentState::new(AgentId(0), Position::new(4, 4), 0)]);
        snap.depots.clear();
        assert!(pipeline.run_tick(&snap).is_err());
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = BotConfig {
            max_cargo: -1,
            ..BotConfig::default()
        };
        assert!(TickPipeline::new(config).is_err());
    }
}
