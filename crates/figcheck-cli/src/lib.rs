//! Figcheck CLI library.
//!
//! Command implementations behind the `figcheck` binary: running the figure
//! regression suite, listing discovered scripts, comparing two images, and
//! checking the environment.

pub mod commands;
