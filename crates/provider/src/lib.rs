//! Cirrus Provider
//!
//! Declarative resource provider for serverless workgroups and service
//! network resource configurations. Every mutating call is followed by a
//! convergence wait that polls the remote API until the resource settles
//! or the wait gives up.

pub mod backoff;
pub mod config;
pub mod driver;
pub mod error;
pub mod provider;
pub mod registry;
pub mod resources;
pub mod retry;
pub mod schema;
pub mod sim;
pub mod state;
pub mod waiter;

pub use config::ProviderConfig;
pub use error::{Diagnostic, ErrorKind, ProviderError};
pub use provider::CirrusProvider;
pub use registry::Registry;
pub use sim::SimulatedCloud;
