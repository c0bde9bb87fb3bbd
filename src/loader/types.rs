//! Loader type definitions.

use thiserror::Error;

/// Errors raised while setting up document discovery.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// A configured glob pattern failed to compile.
    #[error("invalid glob pattern: {0}")]
    Pattern(String),
}
