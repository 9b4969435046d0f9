//! Sky map error types

use thiserror::Error;

/// Errors raised while loading a HEALPix sky map
///
/// Lookups never fail; every variant here comes from `SkyMap::load_fits`,
/// which leaves the map unloaded when it returns one of them.
#[derive(Error, Debug)]
pub enum SkyMapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Memory map failed: {0}")]
    Map(#[from] nix::Error),

    #[error("Sky map file is empty")]
    EmptyFile,

    #[error("Sky map file too large to map: {0} bytes")]
    TooLarge(u64),

    #[error("No BINTABLE extension found")]
    MissingBintable,

    #[error("BINTABLE header has no NSIDE keyword")]
    MissingNside,

    /// NSIDE must be a positive power of two for NESTED ordering
    #[error("Invalid NSIDE: {0}")]
    InvalidNside(i64),
}

pub type SkyMapResult<T> = Result<T, SkyMapError>;
