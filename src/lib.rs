// Library root: the logging bootstrap used by dataflow batch scripts.
// The binary entry point is src/main.rs.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod facility;
pub mod redirect;

pub use bootstrap::{resolve, ConfigInput, Resolver};
pub use error::LogError;
pub use facility::{Level, LogFacility, Logger};
