pub mod catalog;
pub mod interview;
pub mod resume;
