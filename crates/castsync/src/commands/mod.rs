//! Command dispatch: bridges CLI args -> synchronizer -> output formatting.

pub mod addresses;
pub mod config_cmd;
pub mod run;
