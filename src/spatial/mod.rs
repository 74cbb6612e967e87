//! Toroidal grid primitives

pub mod torus;

pub use torus::{Cell, TorusGrid};
