//! Gridlock - deterministic per-tick decision and traffic arbitration
//!
//! A population of independently controlled agents shares a toroidal
//! grid. Each tick every agent's weighted-transition state machine
//! emits a prioritized move intent, and the traffic resolver folds all
//! intents into one collision-free plan: priority escalation, head-on
//! and 3-cycle breaking, then greedy claim assignment with ranked
//! fallbacks. The whole pipeline is a pure in-process computation over
//! an immutable snapshot, invoked once per tick.

pub mod agent;
pub mod core;
pub mod fsm;
pub mod pipeline;
pub mod signals;
pub mod spatial;
pub mod traffic;
