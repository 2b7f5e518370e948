pub mod sort;
pub mod sparse;

pub use sparse::SparseVec;
