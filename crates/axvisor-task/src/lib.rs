pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod invocation;
pub mod logging;
pub mod platform;
pub mod setup;
pub mod workspace;

pub use error::{Error, Result};
