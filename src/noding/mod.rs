pub mod evaluate;

pub use evaluate::{evaluate, evaluate_wire, CrossingPoints, IntersectionResult};
