//! Per-agent decision control

pub mod behavior;
pub mod controller;
pub mod navigate;

pub use behavior::{BehaviorInput, DepotContext, IntentBuilders, IntentFn};
pub use controller::{AgentController, ControlContext, ControllerStep};
