//! Warden - workload supervisor core for credential lifecycle and script health checks.

pub mod adapters;
pub mod domain;
pub mod services;

pub use domain::{DomainError, DomainResult};
pub use services::{Config, ConfigError};
