//! Replay execution and self-healing orchestration.
//!
//! Three layers: the step executor drives single actions against a page
//! port, the run controller sequences one pass over a snapshot, and the
//! healing orchestrator wraps the controller in a bounded repair loop
//! talking to an external oracle.

pub mod controller;
pub mod executor;
pub mod healer;
pub mod policy;
pub mod ports;

pub use controller::RunController;
pub use executor::{StepExecutor, StepSignal};
pub use healer::{HealingOrchestrator, HEAL_VERSION};
pub use policy::{EnginePolicy, SNAPSHOT_TRUNCATION_MARKER};
pub use ports::{
    ExtractionOracle, OracleError, PageError, PagePort, PersistenceSink, RepairOracle,
    RepairRequest, SinkError,
};

#[cfg(test)]
mod fakes;
#[cfg(test)]
mod scenarios;
