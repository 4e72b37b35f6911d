pub use crate::error::*;
pub use crate::grid::*;
pub use crate::loads::*;
pub use crate::model::*;
pub use crate::placer::*;
pub use crate::solver::*;

pub mod error;
pub mod grid;
pub mod loads;
pub mod logger;
pub mod model;
pub mod placer;
pub mod solver;
