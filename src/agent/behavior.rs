//! Pluggable state behaviors
//!
//! Each controller state delegates its acting to an intent builder
//! with the fixed contract `(agent view, grid, depot context) ->
//! MoveIntent`. The standard builders below reproduce the tuned
//! behaviors the pipeline shipped with; a host can swap any of them
//! for its own scoring as long as the replacement is total and returns
//! a well-formed intent.

use crate::agent::navigate;
use crate::core::config::BotConfig;
use crate::core::types::{AgentState, Direction, Position};
use crate::signals::AgentSignals;
use crate::spatial::TorusGrid;
use crate::traffic::MoveIntent;
use ahash::AHashSet;

/// Depot situation for one agent
#[derive(Debug, Clone, Copy)]
pub struct DepotContext<'a> {
    /// All depot cells, in the host's stable order.
    pub positions: &'a [Position],
    /// The depot closest to the agent.
    pub nearest: Position,
    /// Wrapped distance to that depot.
    pub distance: i32,
}

/// Everything a behavior may consult
#[derive(Debug, Clone, Copy)]
pub struct BehaviorInput<'a> {
    pub agent: &'a AgentState,
    pub grid: &'a TorusGrid,
    pub depot: &'a DepotContext<'a>,
    pub signals: &'a AgentSignals,
    pub config: &'a BotConfig,
    /// Cells held by agents that cannot move this tick.
    pub blocked: &'a AHashSet<Position>,
}

/// One state's acting function
pub type IntentFn = Box<dyn Fn(&BehaviorInput<'_>) -> MoveIntent + Send + Sync>;

/// The six acting functions, one per controller state
pub struct IntentBuilders {
    pub explore: IntentFn,
    pub collect: IntentFn,
    pub return_home: IntentFn,
    pub urgent_return: IntentFn,
    pub flee: IntentFn,
    pub hunt: IntentFn,
}

impl IntentBuilders {
    /// The built-in behaviors.
    pub fn standard() -> Self {
        Self {
            explore: Box::new(explore_intent),
            collect: Box::new(collect_intent),
            return_home: Box::new(return_intent),
            urgent_return: Box::new(urgent_return_intent),
            flee: Box::new(flee_intent),
            hunt: Box::new(hunt_intent),
        }
    }
}

impl Default for IntentBuilders {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for IntentBuilders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IntentBuilders { .. }")
    }
}

/// Seek richer ground: grab a rich adjacent cell if one beats the
/// current one, otherwise head for the assigned cluster, with local
/// scavenging once close.
fn explore_intent(input: &BehaviorInput<'_>) -> MoveIntent {
    let agent = input.agent;
    let grid = input.grid;

    let mut local = navigate::score_by_resource(grid, agent.position);
    navigate::sort_scored(&mut local);
    let current_resource = grid.at(agent.position).resource;
    let best_adjacent = local[0].score;
    let rich_floor =
        (input.config.low_cell_threshold * input.config.max_cargo as f32) as i32;

    if best_adjacent > current_resource && best_adjacent > rich_floor {
        let (best, alternatives) = navigate::split_best(&local);
        return MoveIntent {
            agent_id: agent.id,
            current: agent.position,
            desired: grid.offset(agent.position, best),
            desired_direction: best,
            priority: MoveIntent::EXPLORE_PRIORITY,
            alternatives,
        };
    }

    let target = input.signals.explore_target;
    if grid.distance(agent.position, target) > 2 {
        return navigate::navigate_intent(
            agent,
            grid,
            target,
            MoveIntent::EXPLORE_PRIORITY,
            input.blocked,
        );
    }

    // Near the cluster on a decent cell: hold it.
    if current_resource > rich_floor {
        return MoveIntent::stay(agent.id, agent.position, MoveIntent::EXPLORE_PRIORITY);
    }

    let (best, alternatives) = navigate::split_best(&local);
    MoveIntent {
        agent_id: agent.id,
        current: agent.position,
        desired: grid.offset(agent.position, best),
        desired_direction: best,
        priority: MoveIntent::EXPLORE_PRIORITY,
        alternatives,
    }
}

/// Extract in place; fallbacks ranked by neighboring richness so a
/// displaced collector lands somewhere worth mining.
fn collect_intent(input: &BehaviorInput<'_>) -> MoveIntent {
    let agent = input.agent;
    let mut scored = navigate::score_by_resource(input.grid, agent.position);
    navigate::sort_scored(&mut scored);

    MoveIntent {
        agent_id: agent.id,
        current: agent.position,
        desired: agent.position,
        desired_direction: Direction::Stay,
        priority: MoveIntent::COLLECT_PRIORITY,
        alternatives: scored.iter().map(|s| s.direction).collect(),
    }
}

fn return_intent(input: &BehaviorInput<'_>) -> MoveIntent {
    navigate::navigate_intent(
        input.agent,
        input.grid,
        input.depot.nearest,
        MoveIntent::RETURN_PRIORITY,
        input.blocked,
    )
}

fn urgent_return_intent(input: &BehaviorInput<'_>) -> MoveIntent {
    navigate::navigate_intent(
        input.agent,
        input.grid,
        input.depot.nearest,
        MoveIntent::URGENT_PRIORITY,
        input.blocked,
    )
}

/// Put distance between the agent and the pursuer; without a recorded
/// pursuer, widen the gap to the depot approach everyone crowds.
fn flee_intent(input: &BehaviorInput<'_>) -> MoveIntent {
    let agent = input.agent;
    let grid = input.grid;
    let from = input.signals.threat_from.unwrap_or(input.depot.nearest);

    let mut scored: Vec<navigate::ScoredDirection> = Direction::CARDINALS
        .iter()
        .map(|&direction| {
            let target = grid.offset(agent.position, direction);
            navigate::ScoredDirection {
                direction,
                score: grid.distance(target, from),
                blocked: input.blocked.contains(&target),
                on_route: false,
            }
        })
        .collect();
    navigate::sort_scored(&mut scored);
    let (best, alternatives) = navigate::split_best(&scored);

    MoveIntent {
        agent_id: agent.id,
        current: agent.position,
        desired: grid.offset(agent.position, best),
        desired_direction: best,
        priority: MoveIntent::FLEE_PRIORITY,
        alternatives,
    }
}

fn hunt_intent(input: &BehaviorInput<'_>) -> MoveIntent {
    match input.signals.hunt_target {
        Some(target) => navigate::navigate_intent(
            input.agent,
            input.grid,
            target,
            MoveIntent::HUNT_PRIORITY,
            input.blocked,
        ),
        None => MoveIntent::stay(
            input.agent.id,
            input.agent.position,
            MoveIntent::HUNT_PRIORITY,
        ),
    }
}
