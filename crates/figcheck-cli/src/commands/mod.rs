//! CLI command implementations

pub mod compare;
pub mod doctor;
pub mod json_output;
pub mod list;
pub mod run;

mod project;
