//! The PostgreSQL sandbox layer: connections to learner databases, schema
//! lifecycle, statement execution and tenant provisioning.

pub mod connect;
pub mod executor;
pub mod provision;
pub mod schema;
pub mod util;

pub use connect::{connect, ConnectTarget, SandboxConfig, SandboxConnection};
pub use executor::{execute_batch, execute_batch_fetch, execute_interactive};
pub use provision::TenantProvisioner;
