//! Transport adapters for built upload requests

#[cfg(feature = "backend-reqwest")]
pub mod reqwest;
