//! Direction scoring and intent construction
//!
//! Shared movement plumbing for the state behaviors: score the four
//! cardinals against a destination or by cell richness, rank them, and
//! fold the ranking into a [`MoveIntent`] whose alternatives are the
//! remaining directions in order of preference.

use crate::core::types::{AgentState, Direction, Position};
use crate::spatial::TorusGrid;
use crate::traffic::MoveIntent;
use ahash::AHashSet;

/// A cardinal direction with ranking criteria
#[derive(Debug, Clone, Copy)]
pub struct ScoredDirection {
    pub direction: Direction,
    /// Generic score: cell resource when collecting, negated distance
    /// when navigating, distance when fleeing.
    pub score: i32,
    /// Target cell is held by an agent that cannot move this tick.
    pub blocked: bool,
    /// Direction lies on a shortest wrapped route to the destination.
    pub on_route: bool,
}

/// Rank directions: unblocked first, then on-route, then best score.
///
/// The sort is stable and the input is always in `CARDINALS` order, so
/// equal candidates rank deterministically.
pub fn sort_scored(dirs: &mut [ScoredDirection]) {
    dirs.sort_by(|a, b| {
        a.blocked
            .cmp(&b.blocked)
            .then(b.on_route.cmp(&a.on_route))
            .then(b.score.cmp(&a.score))
    });
}

/// Score the cardinals by closeness to `destination`.
pub fn score_toward(
    grid: &TorusGrid,
    origin: Position,
    destination: Position,
    blocked: &AHashSet<Position>,
) -> Vec<ScoredDirection> {
    let on_route = grid.toward(origin, destination);
    Direction::CARDINALS
        .iter()
        .map(|&direction| {
            let target = grid.offset(origin, direction);
            ScoredDirection {
                direction,
                score: -grid.distance(target, destination),
                blocked: blocked.contains(&target),
                on_route: on_route.contains(&direction),
            }
        })
        .collect()
}

/// Score the cardinals by the resource on the cell they reach.
pub fn score_by_resource(grid: &TorusGrid, origin: Position) -> Vec<ScoredDirection> {
    Direction::CARDINALS
        .iter()
        .map(|&direction| {
            let target = grid.offset(origin, direction);
            ScoredDirection {
                direction,
                score: grid.at(target).resource,
                blocked: false,
                on_route: false,
            }
        })
        .collect()
}

/// Split a ranked list into the chosen direction and the fallbacks.
pub fn split_best(sorted: &[ScoredDirection]) -> (Direction, Vec<Direction>) {
    let best = sorted[0].direction;
    let alternatives = sorted[1..].iter().map(|s| s.direction).collect();
    (best, alternatives)
}

/// Intent that moves `agent` one ranked step toward `destination`.
///
/// At the destination already: a stay intent with all cardinals as
/// fallbacks, so the resolver can still push the agent aside.
pub fn navigate_intent(
    agent: &AgentState,
    grid: &TorusGrid,
    destination: Position,
    priority: i32,
    blocked: &AHashSet<Position>,
) -> MoveIntent {
    if grid.normalize(agent.position) == grid.normalize(destination) {
        return MoveIntent::stay(agent.id, agent.position, priority);
    }

    let mut scored = score_toward(grid, agent.position, destination, blocked);
    sort_scored(&mut scored);
    let (best, alternatives) = split_best(&scored);

    MoveIntent {
        agent_id: agent.id,
        current: agent.position,
        desired: grid.offset(agent.position, best),
        desired_direction: best,
        priority,
        alternatives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AgentId;

    fn grid_with(cells: &[(i32, i32, i32)]) -> TorusGrid {
        let mut grid = TorusGrid::new(8, 8).unwrap();
        for &(x, y, resource) in cells {
            grid.at_mut(Position::new(x, y)).resource = resource;
        }
        grid
    }

    #[test]
    fn test_navigate_prefers_shortest_route() {
        let grid = grid_with(&[]);
        let agent = AgentState::new(AgentId(0), Position::new(1, 1), 0);
        let intent = navigate_intent(&agent, &grid, Position::new(4, 1), 50, &AHashSet::new());
        assert_eq!(intent.desired_direction, Direction::East);
        assert_eq!(intent.alternatives.len(), 3);
    }

    #[test]
    fn test_navigate_avoids_blocked_route_cell() {
        let grid = grid_with(&[]);
        let agent = AgentState::new(AgentId(0), Position::new(1, 1), 0);
        let blocked: AHashSet<Position> = [Position::new(2, 1)].into_iter().collect();
        let intent = navigate_intent(&agent, &grid, Position::new(4, 1), 50, &blocked);
        // The on-route cell is blocked; an unblocked detour ranks above it.
        assert_ne!(intent.desired_direction, Direction::East);
        // The blocked direction sinks to the last fallback slot.
        assert_eq!(intent.alternatives.last(), Some(&Direction::East));
    }

    #[test]
    fn test_navigate_at_destination_stays() {
        let grid = grid_with(&[]);
        let agent = AgentState::new(AgentId(0), Position::new(3, 3), 0);
        let intent = navigate_intent(&agent, &grid, Position::new(3, 3), 50, &AHashSet::new());
        assert_eq!(intent.desired_direction, Direction::Stay);
        assert_eq!(intent.alternatives, Direction::CARDINALS.to_vec());
    }

    #[test]
    fn test_resource_scoring_ranks_richest_first() {
        let grid = grid_with(&[(3, 2, 40), (3, 4, 90), (2, 3, 10)]);
        let mut scored = score_by_resource(&grid, Position::new(3, 3));
        sort_scored(&mut scored);
        let (best, alternatives) = split_best(&scored);
        assert_eq!(best, Direction::South); // (3,4) holds 90
        assert_eq!(alternatives[0], Direction::North); // then 40
    }
}
