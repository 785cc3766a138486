//! CLI command implementations.

mod checkpoints;
mod config;
mod doctor;
mod generate;
mod speak;

pub use checkpoints::run_checkpoints;
pub use config::run_config;
pub use doctor::run_doctor;
pub use generate::{run_generate, GenerateArgs};
pub use speak::run_speak;
