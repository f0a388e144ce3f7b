//! Operator-level content-stream surgery

pub mod engine;
pub mod painter;

pub use engine::{RewriteEngine, RewriteStats};
