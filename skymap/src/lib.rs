//! HEALPix sky-brightness map access
//!
//! Reads the 408 MHz all-sky survey stored as a FITS binary table of
//! HEALPix NESTED pixels and answers "sky temperature at (RA, DEC)".
//!
//! ## Layout
//!
//! - `fits`: 2880-byte header blocks and 80-byte keyword cards
//! - `healpix`: NESTED pixel indexing (`ang2pix_nest` / `pix2ang_nest`)
//! - `map`: the memory-mapped `SkyMap` itself

pub mod fits;
pub mod healpix;
mod error;
mod map;

pub use error::{SkyMapError, SkyMapResult};
pub use fits::{HeaderCard, HealpixLayout};
pub use map::SkyMap;

/// Reference frequency of the Haslam survey in MHz
pub const SURVEY_FREQUENCY_MHZ: f64 = 408.0;
