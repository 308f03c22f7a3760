//! Bootstrap layer. Turns a logging configuration into a resolved logger.
//!
//! - **input**: classification of the caller's configuration input.
//! - **builder**: canonical configuration and its default-injection steps.
//! - **resolve**: the resolution procedure and process-wide wiring.

pub mod builder;
pub mod input;
pub mod resolve;

pub use builder::{LogConfig, DATAFLOW_HANDLER};
pub use input::{ConfigInput, Envelope, LogSource};
pub use resolve::{resolve, Plan, Resolver, DEFAULT_LOGGER};
