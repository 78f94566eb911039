//! Adapters binding the supervisor core to the local system.

pub mod process;

pub use process::ProcessScriptExecutor;
