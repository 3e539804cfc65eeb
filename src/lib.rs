// src/lib.rs

pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod keys;
pub mod model;
pub mod org;
pub mod provisioner;
pub mod session;

/// The public prelude for the `vcd-oidc` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::config::{Config, ConfigBuilder};
    pub use crate::error::VcdOidcError;
    pub use crate::model::{ApiVersion, VcdSession};
    pub use crate::provisioner::Provisioner;
}
