//! Traffic resolution: many intents in, one collision-free plan out
//!
//! Single deterministic pass per tick: escalate priorities, break
//! head-on swaps and 3-cycles, freeze immobile agents, then hand out
//! cells greedily in descending priority. One growing claim set backs
//! every stage, so a cell frozen by a conflict is never granted again
//! later in the same tick.
//!
//! Taking a cell that a not-yet-resolved agent stands on displaces
//! that agent immediately onto its best free fallback; if it has
//! none, the taker is denied instead. Either way no agent is ever
//! left without a legal cell, which is what makes the no-shared-
//! destination guarantee unconditional rather than probabilistic.

use crate::core::config::BotConfig;
use crate::core::error::{GridlockError, Result};
use crate::core::types::{AgentId, AgentState, Direction, Position, Tick};
use crate::spatial::TorusGrid;
use crate::traffic::intent::{FinalMove, MoveIntent};
use ahash::{AHashMap, AHashSet};

/// Per-tick context for one `resolve` call
///
/// Replaces the process-wide traffic singleton of older designs:
/// everything the resolver needs arrives by reference and dies with
/// the call.
pub struct TrafficContext<'a> {
    pub grid: &'a TorusGrid,
    pub depots: &'a [Position],
    pub agents: &'a [AgentState],
    pub remaining_ticks: Tick,
    /// Agents that cannot pay this tick's move cost.
    pub immobile: &'a AHashSet<AgentId>,
}

/// Resolve all intents into exactly one final move per live agent.
///
/// Intents for agents absent from the live set are stale: they are
/// skipped with a warning and produce no move. Duplicate agent ids and
/// intents whose desired cell does not match their stated direction
/// are configuration errors and fail the whole call; a partial plan is
/// never emitted.
pub fn resolve(
    intents: &[MoveIntent],
    ctx: &TrafficContext<'_>,
    config: &BotConfig,
) -> Result<Vec<FinalMove>> {
    let grid = ctx.grid;
    let live: AHashMap<AgentId, &AgentState> =
        ctx.agents.iter().map(|agent| (agent.id, agent)).collect();
    let depot_cells: AHashSet<Position> =
        ctx.depots.iter().map(|&d| grid.normalize(d)).collect();

    let mut seen = AHashSet::with_capacity(intents.len());
    for intent in intents {
        if !seen.insert(intent.agent_id) {
            return Err(GridlockError::DuplicateIntent(intent.agent_id));
        }
    }

    let mut requests: Vec<&MoveIntent> = Vec::with_capacity(intents.len());
    for intent in intents {
        if !live.contains_key(&intent.agent_id) {
            tracing::warn!(agent = intent.agent_id.0, "skipping stale move intent");
            continue;
        }
        let stepped = grid.normalize(intent.current.step(intent.desired_direction));
        if stepped != grid.normalize(intent.desired) {
            return Err(GridlockError::InconsistentIntent {
                id: intent.agent_id,
                current: intent.current,
                desired: intent.desired,
            });
        }
        requests.push(intent);
    }

    let priorities = escalate_priorities(&requests, &live, &depot_cells, ctx, config);

    // Descending escalated priority; the stable sort keeps input order
    // within equal priorities, so the plan is reproducible.
    let mut order: Vec<usize> = (0..requests.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(priorities[i]));

    let occupant: AHashMap<Position, usize> = requests
        .iter()
        .enumerate()
        .map(|(i, request)| (grid.normalize(request.current), i))
        .collect();

    let mut board = ClaimBoard {
        requests: &requests,
        grid,
        occupant: &occupant,
        depot_cells: &depot_cells,
        endgame: ctx.remaining_ticks <= config.endgame_collision_window,
        resolved: vec![None; requests.len()],
        claimed: AHashSet::with_capacity(requests.len()),
    };

    board.break_cycles(&priorities);

    // Agents that cannot pay the move cost hold their cells no matter
    // how urgent their intent was.
    for (i, request) in requests.iter().enumerate() {
        if board.resolved[i].is_none() && ctx.immobile.contains(&request.agent_id) {
            board.freeze(i);
        }
    }

    for &i in &order {
        if board.resolved[i].is_none() {
            board.assign(i);
        }
    }

    let moves: Vec<FinalMove> = requests
        .iter()
        .zip(&board.resolved)
        .map(|(request, direction)| FinalMove {
            agent_id: request.agent_id,
            direction: direction.unwrap_or(Direction::Stay),
        })
        .collect();

    tracing::debug!(
        agents = moves.len(),
        stale = intents.len() - moves.len(),
        endgame = board.endgame,
        "traffic resolved"
    );

    Ok(moves)
}

/// Escalate priorities before any conflict is examined.
///
/// A depot squatter jumps to the top tier: the cell must clear for
/// arrivals. Urgent returns close to a depot move into the near
/// sub-tier so the congested ring resolves inside-out, and urgent
/// returns carry a cargo-proportional bonus (at most 9, never enough
/// to cross into the next tier).
fn escalate_priorities(
    requests: &[&MoveIntent],
    live: &AHashMap<AgentId, &AgentState>,
    depot_cells: &AHashSet<Position>,
    ctx: &TrafficContext<'_>,
    config: &BotConfig,
) -> Vec<i32> {
    let grid = ctx.grid;
    requests
        .iter()
        .map(|request| {
            let current = grid.normalize(request.current);
            if depot_cells.contains(&current) {
                return MoveIntent::ON_DEPOT_PRIORITY;
            }

            let mut priority = request.priority;
            if priority < MoveIntent::URGENT_PRIORITY {
                return priority;
            }

            let depot_distance = ctx
                .depots
                .iter()
                .map(|&d| grid.distance(current, d))
                .min()
                .unwrap_or(i32::MAX);
            if depot_distance <= config.urgent_near_distance {
                priority = MoveIntent::URGENT_NEAR_PRIORITY;
            }

            if let Some(agent) = live.get(&request.agent_id) {
                priority += agent.cargo * 9 / config.max_cargo;
            }
            priority
        })
        .collect()
}

/// Mutable resolution state shared by the conflict and greedy stages
struct ClaimBoard<'a> {
    requests: &'a [&'a MoveIntent],
    grid: &'a TorusGrid,
    /// Normalized current cell of each request.
    occupant: &'a AHashMap<Position, usize>,
    depot_cells: &'a AHashSet<Position>,
    endgame: bool,
    resolved: Vec<Option<Direction>>,
    claimed: AHashSet<Position>,
}

impl ClaimBoard<'_> {
    /// Force a request to stay and claim its cell.
    fn freeze(&mut self, i: usize) {
        self.resolved[i] = Some(Direction::Stay);
        self.claimed
            .insert(self.grid.normalize(self.requests[i].current));
    }

    /// Detect head-on swaps and 3-cycles among unresolved requests.
    ///
    /// In a head-on pair the lower-priority agent is frozen; in a
    /// 3-cycle only the lowest of the three. Frozen agents claim their
    /// cells immediately, which means a conflict "winner" whose
    /// desired cell belongs to a frozen agent will detour through its
    /// alternatives during greedy assignment. Cycles of length four or
    /// more are left to the greedy pass.
    fn break_cycles(&mut self, priorities: &[i32]) {
        for i in 0..self.requests.len() {
            if self.resolved[i].is_some() {
                continue;
            }

            let i_current = self.grid.normalize(self.requests[i].current);
            let i_desired = self.grid.normalize(self.requests[i].desired);
            let Some(&j) = self.occupant.get(&i_desired) else {
                continue;
            };
            if j == i || self.resolved[j].is_some() {
                continue;
            }

            let j_desired = self.grid.normalize(self.requests[j].desired);

            // Head-on swap: each wants the other's cell.
            if j_desired == i_current {
                if priorities[i] >= priorities[j] {
                    self.freeze(j);
                } else {
                    self.freeze(i);
                }
                continue;
            }

            // Rotation i -> j -> k -> i.
            let Some(&k) = self.occupant.get(&j_desired) else {
                continue;
            };
            if k == i || k == j || self.resolved[k].is_some() {
                continue;
            }
            if self.grid.normalize(self.requests[k].desired) != i_current {
                continue;
            }

            let lowest = priorities[i].min(priorities[j]).min(priorities[k]);
            if priorities[i] == lowest {
                self.freeze(i);
            } else if priorities[j] == lowest {
                self.freeze(j);
            } else {
                self.freeze(k);
            }
        }
    }

    /// Give one request its best available cell: desired first, then
    /// ranked alternatives, then stay.
    ///
    /// The stay fallback can always claim the agent's own cell: a cell
    /// is only ever granted over an unresolved occupant after the
    /// occupant has been displaced onto a free cell, so an unresolved
    /// agent's cell is never in the claim set.
    fn assign(&mut self, i: usize) {
        let request = self.requests[i];
        let current = self.grid.normalize(request.current);
        let mut visiting = AHashSet::new();
        visiting.insert(i);

        let candidates =
            std::iter::once(request.desired_direction).chain(request.alternatives.iter().copied());
        for dir in candidates {
            let target = self.grid.offset(request.current, dir);

            // In the final ticks, arrivals on a depot bank their cargo
            // and stack; the cell is granted without being claimed.
            if self.endgame
                && dir == request.desired_direction
                && self.depot_cells.contains(&target)
            {
                self.resolved[i] = Some(dir);
                return;
            }

            // Holding the current cell needs no negotiation.
            if target == current {
                self.resolved[i] = Some(dir);
                self.claimed.insert(target);
                return;
            }

            if self.try_take(target, &mut visiting) {
                self.resolved[i] = Some(dir);
                self.claimed.insert(target);
                return;
            }
        }

        self.resolved[i] = Some(Direction::Stay);
        self.claimed.insert(current);
    }

    /// Check whether `target` can be granted, displacing an unresolved
    /// occupant if there is one.
    fn try_take(&mut self, target: Position, visiting: &mut AHashSet<usize>) -> bool {
        if self.claimed.contains(&target) {
            return false;
        }
        let Some(&q) = self.occupant.get(&target) else {
            return true;
        };
        if self.resolved[q].is_some() {
            // Occupant already granted another cell: it is vacating.
            return true;
        }
        if !visiting.insert(q) {
            return false;
        }
        self.displace(q, target, visiting)
    }

    /// Route a displaced agent onto its best option other than the
    /// cell being taken from it. Returns false when it is boxed in; the
    /// caller must then leave the cell alone.
    fn displace(&mut self, q: usize, forbidden: Position, visiting: &mut AHashSet<usize>) -> bool {
        let request = self.requests[q];
        let candidates =
            std::iter::once(request.desired_direction).chain(request.alternatives.iter().copied());
        for dir in candidates {
            let target = self.grid.offset(request.current, dir);
            if target == forbidden {
                continue;
            }
            if self.endgame
                && dir == request.desired_direction
                && self.depot_cells.contains(&target)
            {
                self.resolved[q] = Some(dir);
                return true;
            }
            if self.try_take(target, visiting) {
                self.resolved[q] = Some(dir);
                self.claimed.insert(target);
                return true;
            }
        }
        false
    }
}
