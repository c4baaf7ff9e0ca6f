//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration, fatal placement and catalog conditions, corrupt lattice content,
//! grid file parsing, IO, and generic errors.
use glam::IVec3;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not place sphere {particle} after {attempts} random attempts")]
    PlacementExhausted { particle: u32, attempts: u32 },

    #[error("too many particles: catalog capacity of {capacity} exceeded")]
    CatalogFull { capacity: usize },

    #[error("unknown phase code {code}")]
    UnknownPhase { code: u8 },

    #[error("cluster {cluster} is not active")]
    InactiveCluster { cluster: u32 },

    #[error("corrupt particle cell value {value} at {position}")]
    CorruptCell { value: u16, position: IVec3 },

    #[error("coordinate {position} lies outside the lattice")]
    OutOfLattice { position: IVec3 },

    #[error("grid file line {line}: {message}")]
    GridFormat { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
