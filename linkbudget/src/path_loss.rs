//! Path loss
//!
//! The headline number is the two-way EME radar echo loss
//! `20 log10(f_MHz) + 40 log10(d_km) - 14.6`, whose constant folds in the
//! lunar cross-section and the radar-equation geometry. The lunar scattering
//! loss is still computed from either scattering model, but only for
//! display: adding it to the total would count the Moon twice.

use std::f64::consts::PI;

use crate::results::PathLossResults;
use crate::{MOON_RADIUS_KM, SPEED_OF_LIGHT_M_S};

/// Average lunar radar reflectivity at VHF/UHF
pub const LUNAR_REFLECTIVITY: f64 = 0.07;

/// Constant of the EME echo loss formula (dB)
const ECHO_LOSS_CONSTANT_DB: f64 = 14.6;

const EARTH_RADIUS_KM: f64 = 6371.0;
const ATMOSPHERE_SCALE_HEIGHT_KM: f64 = 8.0;

/// Below this sin(elevation) the flat-earth slant factor is replaced
const MIN_SIN_ELEVATION: f64 = 0.1;

const MIN_COS_BISTATIC: f64 = 0.01;
const MIN_SCATTERING_DENOMINATOR: f64 = 1e-10;

/// Lunar scattering model
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScatteringModel {
    /// Uniform reflector, `sigma = rho * pi * R^2`
    SimpleReflectivity,
    /// Hagfors' law quasi-specular backscatter
    Hagfors,
}

impl ScatteringModel {
    pub fn from_toggle(use_hagfors: bool) -> Self {
        if use_hagfors {
            ScatteringModel::Hagfors
        } else {
            ScatteringModel::SimpleReflectivity
        }
    }
}

/// Wavelength in metres
pub fn wavelength_m(frequency_mhz: f64) -> f64 {
    SPEED_OF_LIGHT_M_S / (frequency_mhz * 1e6)
}

/// One-way free-space path loss, `20 log10(4 pi d / lambda)`
pub fn free_space_loss_db(frequency_mhz: f64, distance_km: f64) -> f64 {
    20.0 * (4.0 * PI * distance_km * 1000.0 / wavelength_m(frequency_mhz)).log10()
}

/// Two-way EME echo loss at the mean of the two station distances
pub fn echo_loss_db(frequency_mhz: f64, distance_tx_km: f64, distance_rx_km: f64) -> f64 {
    let distance = (distance_tx_km + distance_rx_km) / 2.0;
    20.0 * frequency_mhz.log10() + 40.0 * distance.log10() - ECHO_LOSS_CONSTANT_DB
}

/// Geometric cross-section of the lunar disk (m^2)
fn lunar_disk_area_m2() -> f64 {
    let radius_m = MOON_RADIUS_KM * 1000.0;
    PI * radius_m * radius_m
}

/// Scattering loss of a uniform reflector, `-10 log10(rho * pi * R^2)`
pub fn lunar_scattering_loss_db(reflectivity: f64) -> f64 {
    -10.0 * (reflectivity * lunar_disk_area_m2()).log10()
}

/// Surface roughness by frequency band; shorter wavelengths see a rougher Moon
pub fn hagfors_roughness(frequency_mhz: f64) -> f64 {
    if frequency_mhz < 150.0 {
        0.15
    } else if frequency_mhz < 500.0 {
        0.10
    } else if frequency_mhz < 1500.0 {
        0.07
    } else if frequency_mhz < 3000.0 {
        0.05
    } else {
        0.03
    }
}

/// Bistatic angle in degrees from the two station elevations
pub fn bistatic_angle_deg(elevation_tx_deg: f64, elevation_rx_deg: f64) -> f64 {
    ((elevation_tx_deg - elevation_rx_deg).abs() / 2.0).clamp(0.0, 90.0)
}

/// Hagfors scattering function, 1 at normal incidence
///
/// `(cos^4 phi + C sin^2 phi)^-1.5` with Hagfors constant `C = 1 / roughness^2`.
pub fn hagfors_scattering(bistatic_deg: f64, roughness: f64) -> f64 {
    let phi = bistatic_deg.to_radians();
    let cos_phi = phi.cos().max(MIN_COS_BISTATIC);
    let sin_phi = phi.sin();
    let c = 1.0 / (roughness * roughness);

    let denominator = (cos_phi.powi(4) + c * sin_phi * sin_phi).max(MIN_SCATTERING_DENOMINATOR);
    denominator.powf(-1.5)
}

/// Lunar radar cross-section in dBsm under Hagfors' law
pub fn hagfors_rcs_dbsm(bistatic_deg: f64, roughness: f64) -> f64 {
    let sigma = LUNAR_REFLECTIVITY * lunar_disk_area_m2() * hagfors_scattering(bistatic_deg, roughness);
    10.0 * sigma.log10()
}

/// Zenith attenuation of clear air in dB, piecewise in frequency
pub fn zenith_attenuation_db(frequency_mhz: f64) -> f64 {
    let f_ghz = frequency_mhz / 1000.0;
    if frequency_mhz < 100.0 {
        0.001
    } else if frequency_mhz < 1000.0 {
        0.01
    } else if frequency_mhz < 10_000.0 {
        0.01 + (f_ghz - 1.0) * 0.01
    } else if frequency_mhz < 24_000.0 {
        0.1 + (f_ghz - 10.0) * 0.02
    } else {
        0.4 + (f_ghz - 24.0) * 0.05
    }
}

/// Air mass relative to zenith for an elevation in degrees
///
/// `1 / sin(el)` down to sin(el) = 0.1, then a Chapman-function
/// approximation that stays finite at the horizon.
pub fn slant_factor(elevation_deg: f64) -> f64 {
    let elevation = elevation_deg.to_radians();
    let sin_el = elevation.sin();
    if sin_el >= MIN_SIN_ELEVATION {
        return 1.0 / sin_el;
    }

    let ratio = EARTH_RADIUS_KM / ATMOSPHERE_SCALE_HEIGHT_KM;
    let cos_zenith = (PI / 2.0 - elevation).cos();
    (ratio * ratio * cos_zenith * cos_zenith + 2.0 * ratio + 1.0).sqrt() - ratio * cos_zenith
}

/// Atmospheric loss for one leg; 0 when the Moon is below the horizon
pub fn atmospheric_loss_db(frequency_mhz: f64, elevation_deg: f64) -> f64 {
    if elevation_deg < 0.0 {
        return 0.0;
    }
    zenith_attenuation_db(frequency_mhz) * slant_factor(elevation_deg)
}

/// Computes path loss for the round trip
#[derive(Debug, Default, Clone)]
pub struct PathLossEngine;

impl PathLossEngine {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn calculate(
        &self,
        frequency_mhz: f64,
        distance_tx_km: f64,
        distance_rx_km: f64,
        elevation_tx_deg: f64,
        elevation_rx_deg: f64,
        include_atmospheric: bool,
        model: ScatteringModel,
    ) -> PathLossResults {
        let mut results = PathLossResults {
            wavelength_m: wavelength_m(frequency_mhz),
            free_space_loss_db: echo_loss_db(frequency_mhz, distance_tx_km, distance_rx_km),
            lunar_reflectivity: LUNAR_REFLECTIVITY,
            use_hagfors_model: model == ScatteringModel::Hagfors,
            ..Default::default()
        };

        match model {
            ScatteringModel::SimpleReflectivity => {
                results.lunar_scattering_loss_db = lunar_scattering_loss_db(LUNAR_REFLECTIVITY);
                results.lunar_rcs_dbsm = -results.lunar_scattering_loss_db;
            }
            ScatteringModel::Hagfors => {
                let bistatic = bistatic_angle_deg(elevation_tx_deg, elevation_rx_deg);
                let roughness = hagfors_roughness(frequency_mhz);
                let rcs = hagfors_rcs_dbsm(bistatic, roughness);

                results.bistatic_angle_deg = bistatic;
                results.hagfors_roughness = roughness;
                results.lunar_rcs_dbsm = rcs;
                results.hagfors_gain_db = rcs + lunar_scattering_loss_db(LUNAR_REFLECTIVITY);
                results.lunar_scattering_loss_db = -rcs;
            }
        }

        if include_atmospheric {
            if elevation_tx_deg < 0.0 || elevation_rx_deg < 0.0 {
                tracing::debug!(
                    "Moon below horizon (TX {:.1}, RX {:.1} deg), no atmospheric loss on that leg",
                    elevation_tx_deg,
                    elevation_rx_deg
                );
            }
            results.atmospheric_loss_tx_db = atmospheric_loss_db(frequency_mhz, elevation_tx_deg);
            results.atmospheric_loss_rx_db = atmospheric_loss_db(frequency_mhz, elevation_rx_deg);
            results.atmospheric_loss_total_db =
                results.atmospheric_loss_tx_db + results.atmospheric_loss_rx_db;
        }

        results.total_path_loss_db = results.free_space_loss_db + results.atmospheric_loss_total_db;
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_echo_loss_reference_value() {
        let loss = echo_loss_db(144.0, 384_400.0, 384_400.0);
        assert!(approx(loss, 251.958585, 1e-5), "loss = {}", loss);
    }

    #[test]
    fn test_echo_loss_monotonic() {
        let mut previous = 0.0;
        for f in [50.0, 144.0, 432.0, 1296.0, 10_368.0] {
            let loss = echo_loss_db(f, 384_400.0, 384_400.0);
            assert!(loss > previous);
            previous = loss;
        }
        assert!(echo_loss_db(144.0, 406_000.0, 406_000.0) > echo_loss_db(144.0, 356_000.0, 356_000.0));
        // Averaged distance
        assert_eq!(
            echo_loss_db(144.0, 380_000.0, 390_000.0),
            echo_loss_db(144.0, 385_000.0, 385_000.0)
        );
    }

    #[test]
    fn test_free_space_loss() {
        // 20 log10(4 pi d f / c) at 144 MHz over 384400 km
        assert!(approx(free_space_loss_db(144.0, 384_400.0), 187.3107, 1e-3));
    }

    #[test]
    fn test_simple_scattering_loss() {
        // 0.07 * pi * (1737.4 km)^2 is about 6.64e11 m^2
        assert!(approx(lunar_scattering_loss_db(0.07), -118.22, 0.01));
    }

    #[test]
    fn test_hagfors_peak_at_normal_incidence() {
        for f in [144.0, 432.0, 1296.0, 2304.0, 10_368.0] {
            assert!(approx(hagfors_scattering(0.0, hagfors_roughness(f)), 1.0, 1e-12));
        }
        assert!(approx(
            hagfors_rcs_dbsm(0.0, 0.15),
            -lunar_scattering_loss_db(LUNAR_REFLECTIVITY),
            1e-9
        ));
    }

    #[test]
    fn test_hagfors_rcs_decreases_with_bistatic_angle() {
        for roughness in [0.15, 0.10, 0.07, 0.05, 0.03] {
            let mut previous = f64::INFINITY;
            for step in 0..=90 {
                let rcs = hagfors_rcs_dbsm(step as f64, roughness);
                assert!(rcs.is_finite());
                assert!(rcs <= previous, "roughness {} angle {}", roughness, step);
                previous = rcs;
            }
        }
    }

    #[test]
    fn test_roughness_bands() {
        assert_eq!(hagfors_roughness(50.0), 0.15);
        assert_eq!(hagfors_roughness(144.0), 0.15);
        assert_eq!(hagfors_roughness(432.0), 0.10);
        assert_eq!(hagfors_roughness(1296.0), 0.07);
        assert_eq!(hagfors_roughness(2304.0), 0.05);
        assert_eq!(hagfors_roughness(10_368.0), 0.03);
    }

    #[test]
    fn test_bistatic_angle_clamped() {
        assert_eq!(bistatic_angle_deg(30.0, 30.0), 0.0);
        assert_eq!(bistatic_angle_deg(10.0, 50.0), 20.0);
        assert_eq!(bistatic_angle_deg(90.0, -150.0), 90.0);
    }

    #[test]
    fn test_zenith_attenuation_bands() {
        assert_eq!(zenith_attenuation_db(50.0), 0.001);
        assert_eq!(zenith_attenuation_db(144.0), 0.01);
        assert!(approx(zenith_attenuation_db(5000.0), 0.05, 1e-12));
        assert!(approx(zenith_attenuation_db(10_000.0), 0.1, 1e-12));
        assert!(approx(zenith_attenuation_db(24_000.0), 0.4, 1e-12));
        assert!(approx(zenith_attenuation_db(47_000.0), 0.4 + 23.0 * 0.05, 1e-12));
    }

    #[test]
    fn test_slant_factor() {
        assert!(approx(slant_factor(90.0), 1.0, 1e-12));
        assert!(approx(slant_factor(30.0), 2.0, 1e-12));
        // Finite at the horizon: sqrt(2 Re/h0 + 1)
        let horizon = slant_factor(0.0);
        assert!(approx(horizon, (2.0 * 6371.0 / 8.0 + 1.0f64).sqrt(), 1e-9));
        assert!(slant_factor(2.0) < horizon);
    }

    #[test]
    fn test_below_horizon_has_no_atmospheric_loss() {
        assert_eq!(atmospheric_loss_db(1296.0, -5.0), 0.0);
        assert!(atmospheric_loss_db(1296.0, 5.0) > 0.0);
    }

    #[test]
    fn test_engine_total_excludes_scattering() {
        let engine = PathLossEngine::new();
        let r = engine.calculate(144.0, 384_400.0, 384_400.0, 30.0, 30.0, true, ScatteringModel::Hagfors);

        assert!(approx(r.atmospheric_loss_tx_db, 0.02, 1e-12));
        assert!(approx(r.atmospheric_loss_total_db, 0.04, 1e-12));
        assert!(approx(r.total_path_loss_db, 251.998585, 1e-5));
        assert!(approx(r.total_path_loss_db, r.free_space_loss_db + r.atmospheric_loss_total_db, 1e-12));
        assert_eq!(r.bistatic_angle_deg, 0.0);
        assert_eq!(r.hagfors_roughness, 0.15);
        assert!(approx(r.hagfors_gain_db, 0.0, 1e-9));
        assert!(r.use_hagfors_model);
    }

    #[test]
    fn test_engine_without_atmosphere_is_exactly_zero() {
        let engine = PathLossEngine::new();
        for el in [0.0, 5.0, 45.0, 90.0] {
            let r = engine.calculate(
                432.0,
                384_400.0,
                384_400.0,
                el,
                el,
                false,
                ScatteringModel::SimpleReflectivity,
            );
            assert_eq!(r.atmospheric_loss_tx_db, 0.0);
            assert_eq!(r.atmospheric_loss_rx_db, 0.0);
            assert_eq!(r.atmospheric_loss_total_db, 0.0);
            assert_eq!(r.total_path_loss_db, r.free_space_loss_db);
        }
    }

    #[test]
    fn test_simple_model_fields() {
        let r = PathLossEngine::new().calculate(
            1296.0,
            384_400.0,
            384_400.0,
            20.0,
            60.0,
            true,
            ScatteringModel::SimpleReflectivity,
        );
        assert!(!r.use_hagfors_model);
        assert_eq!(r.bistatic_angle_deg, 0.0);
        assert_eq!(r.lunar_reflectivity, 0.07);
        assert!(approx(r.lunar_scattering_loss_db, lunar_scattering_loss_db(0.07), 1e-12));
        assert!(approx(r.wavelength_m, 0.2313, 1e-4));
    }
}
