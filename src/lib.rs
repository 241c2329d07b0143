//! webreplay CLI library: configuration, oracle client, persistence
//! sink and the run dispatcher that wires the engine to a live browser.

pub mod config;
pub mod oracle;
pub mod runner;
pub mod sink;

pub use config::AppConfig;
pub use oracle::{NoopOracle, OpenAiOracle};
pub use runner::{run_directory, run_workflow_file, RunOverrides};
pub use sink::JsonFileSink;
