//! System noise
//!
//! Antenna temperature is the sum of sky, ground spillover and the lunar
//! disk itself. It is referred through the feedline, the receiver is added,
//! and the result is turned into a noise power over the bandwidth.
//!
//! Sky temperature comes from the 408 MHz survey map when one is attached
//! and has data at the Moon's position, otherwise from a coarse analytic
//! galactic model. Both are scaled to the operating frequency with the
//! synchrotron spectral index.

use std::f64::consts::PI;
use std::sync::Arc;

use moonbounce_skymap::{SkyMap, SURVEY_FREQUENCY_MHZ};

use crate::results::NoiseResults;
use crate::snr::watts_to_dbm;
use crate::{BOLTZMANN, REFERENCE_TEMP_K};

/// Galactic synchrotron spectral index
pub const SPECTRAL_INDEX: f64 = -2.55;

/// 408 MHz sky temperature away from the galactic plane (K)
pub const SKY_408_COLD_K: f64 = 20.0;

/// 408 MHz sky temperature near the galactic plane (K)
pub const SKY_408_WARM_K: f64 = 150.0;

/// Brightness contribution of the lunar disk (K)
pub const MOON_BODY_TEMP_K: f64 = 1.0;

/// Beamwidth rule of thumb: HPBW ~ 70 deg / sqrt(G)
const BEAMWIDTH_CONSTANT_DEG: f64 = 70.0;

/// Spillover fraction once the main beam clears the ground
const HIGH_ELEVATION_SPILLOVER: f64 = 0.02;

const SPILLOVER_SAMPLES: usize = 36;

/// Receive-side inputs to the noise calculation
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseInputs {
    pub frequency_mhz: f64,
    pub bandwidth_hz: f64,
    pub rx_gain_dbi: f64,
    pub feedline_loss_db: f64,
    pub noise_figure_db: f64,
    pub elevation_deg: f64,
    pub moon_ra_deg: f64,
    pub moon_dec_deg: f64,
    pub physical_temp_k: f64,
    pub include_ground_spillover: bool,
}

/// Scale a 408 MHz brightness temperature to `frequency_mhz`
pub fn scale_from_survey(t_408: f64, frequency_mhz: f64) -> f64 {
    t_408 * (frequency_mhz / SURVEY_FREQUENCY_MHZ).powf(SPECTRAL_INDEX)
}

/// Very rough galactic latitude in degrees from equatorial coordinates
///
/// Uses |Dec|, halved for RA between 240 and 300 degrees where the
/// galactic center lies.
pub fn estimate_galactic_latitude(ra_deg: f64, dec_deg: f64) -> f64 {
    let latitude = dec_deg.abs();
    if ra_deg > 240.0 && ra_deg < 300.0 {
        latitude * 0.5
    } else {
        latitude
    }
}

/// 408 MHz temperature of the analytic model at a galactic latitude
pub fn analytic_sky_408(galactic_latitude_deg: f64) -> f64 {
    if galactic_latitude_deg > 60.0 {
        SKY_408_COLD_K
    } else if galactic_latitude_deg < 20.0 {
        SKY_408_WARM_K
    } else {
        let factor = (galactic_latitude_deg - 20.0) / 40.0;
        SKY_408_WARM_K + factor * (SKY_408_COLD_K - SKY_408_WARM_K)
    }
}

/// Half-power beamwidth in degrees for an antenna gain in dBi
pub fn beamwidth_deg(gain_dbi: f64) -> f64 {
    BEAMWIDTH_CONSTANT_DEG / 10f64.powf(gain_dbi / 10.0).sqrt()
}

/// Ground noise picked up by the antenna pattern (K)
///
/// Below the horizon the antenna sees only ground. Above 1.5 beamwidths a
/// flat 2% is assumed. In between, a cos^2 main lobe spanning three
/// beamwidths is sampled and the fraction falling below the horizon is
/// taken.
///
/// The two regimes do not meet: the sampled fraction reaches 0 K at
/// exactly 1.5 beamwidths, and just above that the flat 2% applies. The
/// result is therefore not monotonic in elevation at that point.
pub fn ground_spillover_temp(elevation_deg: f64, gain_dbi: f64, physical_temp_k: f64) -> f64 {
    if elevation_deg < 0.0 {
        return physical_temp_k;
    }

    let beamwidth = beamwidth_deg(gain_dbi);
    if elevation_deg > 1.5 * beamwidth {
        return physical_temp_k * HIGH_ELEVATION_SPILLOVER;
    }

    let span = 3.0 * beamwidth;
    let step = span / SPILLOVER_SAMPLES as f64;
    let below_horizon: f64 = (0..SPILLOVER_SAMPLES)
        .map(|i| -span / 2.0 + (i as f64 + 0.5) * step)
        .filter(|offset| elevation_deg + offset < 0.0)
        .map(|offset| (PI * offset / span).cos().powi(2) * step)
        .sum();

    physical_temp_k * below_horizon / span
}

/// Antenna temperature referred through a lossy feedline at `physical_temp_k`
pub fn antenna_effective_temp(antenna_temp_k: f64, feedline_loss_db: f64, physical_temp_k: f64) -> f64 {
    let loss = 10f64.powf(feedline_loss_db / 10.0);
    antenna_temp_k / loss + physical_temp_k * (1.0 - 1.0 / loss)
}

/// Receiver noise temperature from noise figure
pub fn receiver_noise_temp(noise_figure_db: f64) -> f64 {
    REFERENCE_TEMP_K * (10f64.powf(noise_figure_db / 10.0) - 1.0)
}

/// Thermal noise power `k T B` in watts
pub fn noise_power_w(system_temp_k: f64, bandwidth_hz: f64) -> f64 {
    BOLTZMANN * system_temp_k * bandwidth_hz
}

/// Computes receive system noise
///
/// The sky map, if any, is shared read-only; several engines may hold the
/// same map.
#[derive(Debug, Default, Clone)]
pub struct NoiseEngine {
    sky_map: Option<Arc<SkyMap>>,
}

impl NoiseEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sky_map(sky_map: Arc<SkyMap>) -> Self {
        Self {
            sky_map: Some(sky_map),
        }
    }

    pub fn set_sky_map(&mut self, sky_map: Option<Arc<SkyMap>>) {
        self.sky_map = sky_map;
    }

    /// A loaded sky map is attached
    pub fn has_sky_map(&self) -> bool {
        self.sky_map.as_ref().is_some_and(|m| m.is_loaded())
    }

    /// Sky temperature at the operating frequency, and whether the map supplied it
    pub fn sky_temperature(&self, frequency_mhz: f64, ra_deg: f64, dec_deg: f64) -> (f64, bool) {
        if let Some(map) = self.sky_map.as_ref().filter(|m| m.is_loaded()) {
            let t_408 = map.temperature(ra_deg, dec_deg);
            if t_408 > 0.0 {
                return (scale_from_survey(t_408, frequency_mhz), true);
            }
            tracing::debug!(
                "No sky map data at RA {:.2} Dec {:.2}, using analytic model",
                ra_deg,
                dec_deg
            );
        }

        let latitude = estimate_galactic_latitude(ra_deg, dec_deg);
        (scale_from_survey(analytic_sky_408(latitude), frequency_mhz), false)
    }

    pub fn calculate(&self, inputs: &NoiseInputs) -> NoiseResults {
        let (sky, sky_from_map) =
            self.sky_temperature(inputs.frequency_mhz, inputs.moon_ra_deg, inputs.moon_dec_deg);

        let spillover = if inputs.include_ground_spillover {
            if inputs.elevation_deg < 0.0 {
                tracing::debug!(
                    "Moon below horizon ({:.1} deg), antenna sees ground",
                    inputs.elevation_deg
                );
            }
            ground_spillover_temp(inputs.elevation_deg, inputs.rx_gain_dbi, inputs.physical_temp_k)
        } else {
            0.0
        };

        let antenna = sky + spillover + MOON_BODY_TEMP_K;
        let effective = antenna_effective_temp(antenna, inputs.feedline_loss_db, inputs.physical_temp_k);
        let receiver = receiver_noise_temp(inputs.noise_figure_db);
        let system = effective + receiver;
        let power = noise_power_w(system, inputs.bandwidth_hz);

        NoiseResults {
            sky_noise_temp_k: sky,
            ground_spillover_temp_k: spillover,
            moon_body_temp_k: MOON_BODY_TEMP_K,
            antenna_noise_temp_k: antenna,
            antenna_effective_temp_k: effective,
            receiver_noise_temp_k: receiver,
            system_noise_temp_k: system,
            noise_power_dbm: watts_to_dbm(power),
            noise_power_w: power,
            sky_from_map,
        }
    }
}
