//! Survey CLI - Command line tools for the survey flight planner.
//!
//! This crate provides the `plan_flight` binary and the helpers it uses to
//! load scenarios and print flight plans.

pub mod report;

pub use report::{load_scenario, move_line, move_lines};
