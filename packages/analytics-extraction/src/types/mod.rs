//! Data types for the analytics extraction library.

pub mod config;
pub mod endpoint;
pub mod record;
pub mod state;
pub mod window;
