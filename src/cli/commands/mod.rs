pub mod analyze;
pub mod batch;
pub mod config;
pub mod design;
pub mod generate;
pub mod select;
