pub mod pairwise; // all-pairs distance primitive
pub mod spatial_graph; // coordinate and histology-augmented graph transforms
pub mod transform; // transform entry point
