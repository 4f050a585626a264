//! # mintpass-runtime: Runtime Host
//!
//! Hosts ledgers and sale extensions side by side and routes calls between
//! them.
//!
//! - **Runtime** (`runtime.rs`): deployment with derived addresses, lookup,
//!   administrative routing and both mint paths. Serializable to JSON.
//!
//! - **Shared Runtime** (`shared.rs`): a cloneable handle that serializes
//!   concurrent callers through one lock.
//!
//! - **Scenario** (`config.rs`, `scenario.rs`): YAML deployments and call
//!   sequences with expected outcomes, replayed against a fresh runtime.

pub mod config;
pub mod runtime;
pub mod scenario;
pub mod shared;

pub use config::{ConfigError, ScenarioConfig, Step, StepConfig};
pub use runtime::Runtime;
pub use scenario::{Scenario, ScenarioReport, StepReport};
pub use shared::SharedRuntime;
