//! Delve Core - shared infrastructure for the research workspace
//!
//! Error taxonomy, logging, configuration, the capability traits every
//! collaborator implements, and the research data model.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
