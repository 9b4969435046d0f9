//! Polarization collaborator
//!
//! The orchestrator asks a [`PolarizationModel`] for the polarization loss
//! between the two stations. Ionospheric Faraday rotation needs TEC and
//! geomagnetic data from external services, so it is left to implementors
//! of the trait. The built-in [`SpatialPolarization`] covers the geometric
//! part: parallactic-angle rotation between the sites and the handedness
//! flip on reflection.

use crate::params::{LinkBudgetParameters, SiteParameters};
use crate::results::{GeometryResults, PolarizationResults};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Smallest PLF converted to dB, keeps total mismatch finite
const MIN_PLF: f64 = 1e-10;

/// Computes polarization coupling for a link
///
/// Implementations report failure with [`PolarizationResults::failed`]
/// rather than an error: the link budget carries on with a huge loss.
pub trait PolarizationModel: Send + Sync {
    fn calculate(
        &self,
        params: &LinkBudgetParameters,
        geometry: &GeometryResults,
    ) -> PolarizationResults;

    fn name(&self) -> &'static str;
}

/// Perfectly matched antennas, no loss
#[derive(Debug, Default, Clone, Copy)]
pub struct MatchedPolarization;

impl PolarizationModel for MatchedPolarization {
    fn calculate(&self, _: &LinkBudgetParameters, _: &GeometryResults) -> PolarizationResults {
        PolarizationResults::default()
    }

    fn name(&self) -> &'static str {
        "matched"
    }
}

/// Geometric polarization model without Faraday rotation
#[derive(Debug, Default, Clone, Copy)]
pub struct SpatialPolarization;

/// Parallactic angle in radians for a site latitude, declination and hour angle
pub fn parallactic_angle(latitude: f64, declination: f64, hour_angle: f64) -> f64 {
    let (sin_h, cos_h) = hour_angle.sin_cos();
    let (sin_lat, cos_lat) = latitude.sin_cos();
    let (sin_dec, cos_dec) = declination.sin_cos();
    (sin_h * cos_lat).atan2(sin_lat * cos_dec - cos_lat * sin_dec * cos_h)
}

/// Thin-shell ionospheric slant factor at a shell height
pub fn ionospheric_slant_factor(elevation_deg: f64, shell_height_km: f64) -> f64 {
    let x = EARTH_RADIUS_KM * elevation_deg.to_radians().cos() / (EARTH_RADIUS_KM + shell_height_km);
    1.0 / (1.0 - x * x).sqrt()
}

/// Power coupled between two polarization states, 0 to 1
///
/// `rotation` is the angle between the two polarization ellipses' major
/// axes, in radians.
pub fn polarization_loss_factor(chi_tx: f64, chi_rx: f64, rotation: f64) -> f64 {
    let (sin_t, cos_t) = (2.0 * chi_tx).sin_cos();
    let (sin_r, cos_r) = (2.0 * chi_rx).sin_cos();
    0.5 * (1.0 + sin_t * sin_r + cos_t * cos_r * (2.0 * rotation).cos())
}

/// PLF in dB of loss
pub fn plf_to_loss_db(plf: f64) -> f64 {
    -10.0 * plf.max(MIN_PLF).log10()
}

impl SpatialPolarization {
    fn site_parallactic(site: &SiteParameters, declination: f64, hour_angle: f64) -> f64 {
        parallactic_angle(site.latitude, declination, hour_angle)
    }
}

impl PolarizationModel for SpatialPolarization {
    fn calculate(
        &self,
        params: &LinkBudgetParameters,
        geometry: &GeometryResults,
    ) -> PolarizationResults {
        let declination = params.moon_ephemeris.declination;
        let q_tx = Self::site_parallactic(&params.tx_site, declination, geometry.hour_angle_tx_rad);
        let q_rx = Self::site_parallactic(&params.rx_site, declination, geometry.hour_angle_rx_rad);

        let spatial = if params.include_spatial_rotation {
            q_tx - q_rx
        } else {
            0.0
        };

        let total = spatial;
        let mismatch = total + params.tx_site.psi - params.rx_site.psi;

        // Reflection reverses the sense of circular polarization
        let chi_tx = if params.include_moon_reflection {
            -params.tx_site.chi
        } else {
            params.tx_site.chi
        };

        let plf = polarization_loss_factor(chi_tx, params.rx_site.chi, mismatch);
        if !plf.is_finite() {
            tracing::warn!("Polarization loss factor is not finite, reporting failure");
            return PolarizationResults::failed();
        }
        let plf = plf.clamp(0.0, 1.0);

        PolarizationResults {
            spatial_rotation_deg: spatial.to_degrees(),
            faraday_rotation_tx_deg: 0.0,
            faraday_rotation_rx_deg: 0.0,
            total_rotation_deg: total.to_degrees(),
            plf,
            polarization_loss_db: plf_to_loss_db(plf),
            polarization_efficiency_percent: plf * 100.0,
            parallactic_angle_tx_deg: q_tx.to_degrees(),
            parallactic_angle_rx_deg: q_rx.to_degrees(),
            slant_factor_tx: ionospheric_slant_factor(
                geometry.moon_elevation_tx_deg,
                params.ionosphere.hmf2_tx,
            ),
            slant_factor_rx: ionospheric_slant_factor(
                geometry.moon_elevation_rx_deg,
                params.ionosphere.hmf2_rx,
            ),
        }
    }

    fn name(&self) -> &'static str {
        "spatial"
    }
}
