//! Weighted-category gradebook: category and class averages, letter grades,
//! what-if projections, and the `.gb` file format.

pub mod calc;
pub mod category;
pub mod config;
pub mod error;
pub mod gradebook;
pub mod ipc;
pub mod loader;
pub mod logging;

pub use category::{Assignment, AssignmentDate, Category, ForcedAverage};
pub use error::{GradebookError, LoadError};
pub use gradebook::{
    default_grade_bands, CategoryEntry, GradeBand, Gradebook, GradebookId, HypotheticalProjection,
    Projection,
};
