pub mod pairs;
pub mod spatial_index;


pub use pairs::{generate_pairs, CandidatePair};
pub use spatial_index::SpatialIndex;
