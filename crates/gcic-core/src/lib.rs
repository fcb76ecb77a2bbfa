//! GalacticCIC core - shared types, errors, constants, and config

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::DashboardConfig;
pub use error::{Error, Result};
pub use types::*;
