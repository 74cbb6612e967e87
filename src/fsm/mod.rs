//! Generic weighted-transition state machine engine

pub mod machine;

pub use machine::{BehaviorFn, Machine, MachineBuilder, ScoreFn, StateId};
