//! Move intents and conflict resolution

pub mod intent;
pub mod resolver;

pub use intent::{FinalMove, MoveIntent};
pub use resolver::{resolve, TrafficContext};
