//! Earth-Moon-Earth (moonbounce) link budget calculator
//!
//! Predicts whether a signal bounced off the Moon can be decoded at the
//! receiving station, and by how much margin. The pipeline runs
//! geometry, then path loss, then polarization, then noise, then SNR, and is
//! driven by [`LinkBudget`]:
//!
//! ```no_run
//! use moonbounce_linkbudget::{LinkBudget, LinkBudgetParameters};
//!
//! let mut budget = LinkBudget::new(LinkBudgetParameters::default());
//! let results = budget.calculate();
//! println!("{}", results);
//! ```
//!
//! ## Modules
//!
//! - `geometry`: Moon azimuth/elevation per site, libration spreading
//! - `path_loss`: radar echo loss, lunar scattering, atmosphere
//! - `polarization`: the polarization collaborator seam
//! - `noise`: sky, spillover, receiver and system noise
//! - `snr`: received power, fading margin, link margin
//! - `engine`: validation and orchestration

pub mod engine;
pub mod error;
pub mod geometry;
pub mod noise;
pub mod params;
pub mod path_loss;
pub mod polarization;
pub mod results;
pub mod snr;

pub use engine::{CalculationState, LinkBudget};
pub use error::{LinkBudgetError, LinkBudgetResult};
pub use geometry::GeometryEngine;
pub use noise::NoiseEngine;
pub use params::{
    DataSourceConfig, IonosphereData, LinkBudgetParameters, MoonEphemeris, SiteParameters,
};
pub use path_loss::{PathLossEngine, ScatteringModel};
pub use polarization::{MatchedPolarization, PolarizationModel, SpatialPolarization};
pub use results::{
    frequency_band, GeometryResults, LinkBudgetResults, NoiseResults, PathLossResults,
    PolarizationResults, SnrResults,
};
pub use snr::{FadingMargin, SnrEngine};

/// Speed of light in m/s
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Speed of light in km/s
pub const SPEED_OF_LIGHT_KM_S: f64 = SPEED_OF_LIGHT_M_S / 1000.0;

/// Boltzmann constant in J/K
pub const BOLTZMANN: f64 = 1.380_648_52e-23;

/// Mean lunar radius in km
pub const MOON_RADIUS_KM: f64 = 1737.4;

/// Reference temperature for noise figure conversion (K)
pub const REFERENCE_TEMP_K: f64 = 290.0;
