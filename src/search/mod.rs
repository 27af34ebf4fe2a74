pub mod mmr;
pub mod vector;

pub use vector::{IndexedRecord, VectorHit, VectorIndex};
