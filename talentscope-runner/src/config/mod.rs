pub mod runner_config;

pub use runner_config::{LogFormat, RunnerConfig};
