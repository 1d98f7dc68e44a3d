pub mod binarization;
pub mod graph_builder;
pub mod morphology;
pub mod preprocessing;
pub mod simplification;
pub mod thinning;

pub use binarization::*;
pub use graph_builder::*;
pub use preprocessing::*;
pub use simplification::*;
pub use thinning::*;
