pub mod categories;
pub mod core;
pub mod grade_bands;
pub mod gradebooks;
pub mod grades;
