//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Unique identifier for agents
///
/// Assigned by the host process and stable for the agent's lifetime.
/// Never generated internally: the pipeline must stay deterministic
/// across runs, so identity always comes from the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Movement direction on the grid
///
/// `CARDINALS` fixes the iteration order; every scan over directions
/// uses it so direction-dependent tie-breaks are reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Stay,
}

impl Direction {
    /// The four movement directions, in canonical scan order.
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit offset of this direction in (dx, dy), y growing southward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::Stay => (0, 0),
        }
    }

    /// The opposite direction (`Stay` is its own opposite).
    pub fn inverted(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Stay => Direction::Stay,
        }
    }
}

/// Integer cell position
///
/// Raw coordinates may leave the grid bounds after an offset; only
/// [`TorusGrid::normalize`](crate::spatial::TorusGrid::normalize)
/// folds them back. Equality on `Position` is raw equality - compare
/// normalized values when wrap-around matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position one step in `dir`, without normalization.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Phase of the match, derived from the tick fraction
///
/// Later phases tighten hunt radii and eventually trigger the
/// end-game depot rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GamePhase {
    Early,
    Mid,
    Late,
    Endgame,
}

/// Snapshot of one live agent, supplied by the host each tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub position: Position,
    /// Carried value (cargo); spent on movement, banked at depots.
    pub cargo: i32,
}

impl AgentState {
    pub fn new(id: AgentId, position: Position, cargo: i32) -> Self {
        Self {
            id,
            position,
            cargo,
        }
    }
}

/// Snapshot of one hostile agent, used by threat and hunt scans
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HostileState {
    pub position: Position,
    pub cargo: i32,
}
