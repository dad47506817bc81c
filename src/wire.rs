//! Binary encoding for shapes handed to workers.
//!
//! Each indexed shape is encoded once before dispatch. Workers decode their own copy per pair,
//! so no live geometry is ever shared across the pool.

use crate::error::{EngineError, Result};
use crate::shape::Shape;

pub fn encode(shape: &Shape) -> Result<Vec<u8>> {
    bincode::serialize(shape).map_err(|e| EngineError::Wire(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Shape> {
    bincode::deserialize(bytes).map_err(|e| EngineError::PairEvaluation(format!("undecodable shape: {}", e)))
}
