use crate::core::types::{AgentId, Position};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridlockError {
    #[error("state machine has no states")]
    EmptyMachine,

    #[error("transition references unknown state index {0}")]
    UnknownState(usize),

    #[error("grid dimensions must be positive, got {width}x{height}")]
    EmptyGrid { width: i32, height: i32 },

    #[error("snapshot carries no depot positions")]
    NoDepots,

    #[error("agent {0:?} appears twice in the snapshot")]
    DuplicateAgent(AgentId),

    #[error("duplicate move intent for agent {0:?}")]
    DuplicateIntent(AgentId),

    #[error("intent for agent {id:?} desires {desired:?}, not reachable from {current:?}")]
    InconsistentIntent {
        id: AgentId,
        current: Position,
        desired: Position,
    },

    #[error("no signals computed for agent {0:?}")]
    MissingSignals(AgentId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, GridlockError>;
