//! Per-stage and aggregate link budget results

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moon pointing for both stations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryResults {
    pub distance_tx_km: f64,
    pub distance_rx_km: f64,
    pub total_path_length_km: f64,
    /// Reserved, always 0 in the pipeline
    pub doppler_shift_hz: f64,
    pub moon_ra_deg: f64,
    pub moon_dec_deg: f64,
    pub moon_azimuth_tx_deg: f64,
    pub moon_elevation_tx_deg: f64,
    pub moon_azimuth_rx_deg: f64,
    pub moon_elevation_rx_deg: f64,
    pub moon_distance_km: f64,
    pub hour_angle_tx_rad: f64,
    pub hour_angle_rx_rad: f64,
    /// Libration Doppler spread, `None` without libration rates
    pub spectral_spread_hz: Option<f64>,
    pub coherent_integration_limit_s: Option<f64>,
    pub libration_velocity_m_s: Option<f64>,
    pub ephemeris_source: String,
}

impl Default for GeometryResults {
    fn default() -> Self {
        Self {
            distance_tx_km: 0.0,
            distance_rx_km: 0.0,
            total_path_length_km: 0.0,
            doppler_shift_hz: 0.0,
            moon_ra_deg: 0.0,
            moon_dec_deg: 0.0,
            moon_azimuth_tx_deg: 0.0,
            moon_elevation_tx_deg: 0.0,
            moon_azimuth_rx_deg: 0.0,
            moon_elevation_rx_deg: 0.0,
            moon_distance_km: crate::params::MOON_MEAN_DISTANCE_KM,
            hour_angle_tx_rad: 0.0,
            hour_angle_rx_rad: 0.0,
            spectral_spread_hz: None,
            coherent_integration_limit_s: None,
            libration_velocity_m_s: None,
            ephemeris_source: "Manual".to_string(),
        }
    }
}

/// Path loss breakdown
///
/// `lunar_scattering_loss_db` is informational. The echo formula already
/// accounts for the lunar cross-section, so it is never part of
/// `total_path_loss_db`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathLossResults {
    /// Combined two-way radar echo loss
    pub free_space_loss_db: f64,
    pub lunar_scattering_loss_db: f64,
    pub atmospheric_loss_tx_db: f64,
    pub atmospheric_loss_rx_db: f64,
    pub atmospheric_loss_total_db: f64,
    pub total_path_loss_db: f64,
    pub wavelength_m: f64,
    pub lunar_reflectivity: f64,

    pub use_hagfors_model: bool,
    pub bistatic_angle_deg: f64,
    pub hagfors_roughness: f64,
    pub lunar_rcs_dbsm: f64,
    /// Gain of the Hagfors cross-section over the simple reflector
    pub hagfors_gain_db: f64,
}

impl Default for PathLossResults {
    fn default() -> Self {
        Self {
            free_space_loss_db: 0.0,
            lunar_scattering_loss_db: 0.0,
            atmospheric_loss_tx_db: 0.0,
            atmospheric_loss_rx_db: 0.0,
            atmospheric_loss_total_db: 0.0,
            total_path_loss_db: 0.0,
            wavelength_m: 0.0,
            lunar_reflectivity: crate::path_loss::LUNAR_REFLECTIVITY,
            use_hagfors_model: true,
            bistatic_angle_deg: 0.0,
            hagfors_roughness: 0.0,
            lunar_rcs_dbsm: 0.0,
            hagfors_gain_db: 0.0,
        }
    }
}

/// Output of a polarization service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolarizationResults {
    pub spatial_rotation_deg: f64,
    pub faraday_rotation_tx_deg: f64,
    pub faraday_rotation_rx_deg: f64,
    pub total_rotation_deg: f64,
    /// Polarization loss factor, 0 to 1
    pub plf: f64,
    pub polarization_loss_db: f64,
    pub polarization_efficiency_percent: f64,
    pub parallactic_angle_tx_deg: f64,
    pub parallactic_angle_rx_deg: f64,
    pub slant_factor_tx: f64,
    pub slant_factor_rx: f64,
}

/// Loss reported by a polarization service that could not produce a result
pub const FAILED_POLARIZATION_LOSS_DB: f64 = 999.0;

impl Default for PolarizationResults {
    fn default() -> Self {
        Self {
            spatial_rotation_deg: 0.0,
            faraday_rotation_tx_deg: 0.0,
            faraday_rotation_rx_deg: 0.0,
            total_rotation_deg: 0.0,
            plf: 1.0,
            polarization_loss_db: 0.0,
            polarization_efficiency_percent: 100.0,
            parallactic_angle_tx_deg: 0.0,
            parallactic_angle_rx_deg: 0.0,
            slant_factor_tx: 1.0,
            slant_factor_rx: 1.0,
        }
    }
}

impl PolarizationResults {
    /// Failure sentinel: no coupling, enormous but finite loss
    pub fn failed() -> Self {
        Self {
            plf: 0.0,
            polarization_loss_db: FAILED_POLARIZATION_LOSS_DB,
            polarization_efficiency_percent: 0.0,
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.plf == 0.0 && self.polarization_loss_db == FAILED_POLARIZATION_LOSS_DB
    }
}

/// Noise temperatures and power at the receiver input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseResults {
    pub sky_noise_temp_k: f64,
    pub ground_spillover_temp_k: f64,
    pub moon_body_temp_k: f64,
    pub antenna_noise_temp_k: f64,
    /// Antenna temperature referred through the feedline
    pub antenna_effective_temp_k: f64,
    pub receiver_noise_temp_k: f64,
    pub system_noise_temp_k: f64,
    pub noise_power_dbm: f64,
    pub noise_power_w: f64,
    /// Sky temperature came from the 408 MHz map rather than the analytic model
    pub sky_from_map: bool,
}

/// Signal level and decode margin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnrResults {
    pub received_signal_power_dbm: f64,
    pub received_signal_power_w: f64,
    pub snr_db: f64,
    pub fading_margin_db: f64,
    pub effective_snr_db: f64,
    pub required_snr_db: f64,
    pub link_margin_db: f64,
    pub link_viable: bool,
}

impl Default for SnrResults {
    fn default() -> Self {
        Self {
            received_signal_power_dbm: 0.0,
            received_signal_power_w: 0.0,
            snr_db: 0.0,
            fading_margin_db: 3.0,
            effective_snr_db: 0.0,
            required_snr_db: crate::snr::DEFAULT_REQUIRED_SNR_DB,
            link_margin_db: 0.0,
            link_viable: false,
        }
    }
}

/// Everything one `calculate()` call produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkBudgetResults {
    pub geometry: GeometryResults,
    pub path_loss: PathLossResults,
    pub polarization: PolarizationResults,
    pub noise: NoiseResults,
    pub snr: SnrResults,

    /// Path loss plus polarization loss
    pub total_loss_db: f64,
    pub calculation_success: bool,
    pub error_message: String,
    pub calculation_time: DateTime<Utc>,
    pub frequency_mhz: f64,
}

impl LinkBudgetResults {
    /// A failed result carrying only the error message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            calculation_success: false,
            error_message: message.into(),
            calculation_time: Utc::now(),
            ..Default::default()
        }
    }
}

/// Amateur band label for a frequency
pub fn frequency_band(frequency_mhz: f64) -> &'static str {
    match frequency_mhz {
        f if (50.0..=54.0).contains(&f) => "6m",
        f if (144.0..=148.0).contains(&f) => "2m",
        f if (222.0..=225.0).contains(&f) => "1.25m",
        f if (420.0..=450.0).contains(&f) => "70cm",
        f if (902.0..=928.0).contains(&f) => "33cm",
        f if (1240.0..=1300.0).contains(&f) => "23cm",
        f if (2300.0..=2450.0).contains(&f) => "13cm",
        f if (3300.0..=3500.0).contains(&f) => "9cm",
        f if (5650.0..=5925.0).contains(&f) => "6cm",
        f if (10_000.0..=10_500.0).contains(&f) => "3cm",
        f if (24_000.0..=24_250.0).contains(&f) => "1.2cm",
        _ => "non-amateur",
    }
}

impl fmt::Display for LinkBudgetResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.calculation_success {
            return write!(f, "Link budget failed: {}", self.error_message);
        }

        let g = &self.geometry;
        let p = &self.path_loss;
        let pol = &self.polarization;
        let n = &self.noise;
        let s = &self.snr;

        writeln!(
            f,
            "EME link budget at {:.3} MHz ({}), {}",
            self.frequency_mhz,
            frequency_band(self.frequency_mhz),
            self.calculation_time.format("%Y-%m-%d %H:%M:%S UTC")
        )?;

        writeln!(f, "Geometry")?;
        writeln!(
            f,
            "  TX moon az/el     {:8.2} / {:6.2} deg",
            g.moon_azimuth_tx_deg, g.moon_elevation_tx_deg
        )?;
        writeln!(
            f,
            "  RX moon az/el     {:8.2} / {:6.2} deg",
            g.moon_azimuth_rx_deg, g.moon_elevation_rx_deg
        )?;
        writeln!(f, "  Path length       {:10.0} km", g.total_path_length_km)?;
        if let (Some(spread), Some(limit)) = (g.spectral_spread_hz, g.coherent_integration_limit_s)
        {
            writeln!(f, "  Libration spread  {:10.3} Hz (coherent limit {:.1} s)", spread, limit)?;
        }

        writeln!(f, "Path loss")?;
        writeln!(f, "  Echo loss         {:10.2} dB", p.free_space_loss_db)?;
        writeln!(f, "  Atmosphere        {:10.2} dB", p.atmospheric_loss_total_db)?;
        writeln!(f, "  Total path loss   {:10.2} dB", p.total_path_loss_db)?;
        if p.use_hagfors_model {
            writeln!(
                f,
                "  Hagfors RCS       {:10.2} dBsm at {:.2} deg bistatic",
                p.lunar_rcs_dbsm, p.bistatic_angle_deg
            )?;
        }

        writeln!(f, "Polarization")?;
        writeln!(f, "  Total rotation    {:10.2} deg", pol.total_rotation_deg)?;
        writeln!(f, "  Polarization loss {:10.2} dB", pol.polarization_loss_db)?;

        writeln!(f, "Noise")?;
        writeln!(f, "  Sky temperature   {:10.1} K", n.sky_noise_temp_k)?;
        writeln!(f, "  Ground spillover  {:10.1} K", n.ground_spillover_temp_k)?;
        writeln!(f, "  System temp       {:10.1} K", n.system_noise_temp_k)?;
        writeln!(f, "  Noise power       {:10.2} dBm", n.noise_power_dbm)?;

        writeln!(f, "Signal")?;
        writeln!(f, "  Total loss        {:10.2} dB", self.total_loss_db)?;
        writeln!(f, "  Received power    {:10.2} dBm", s.received_signal_power_dbm)?;
        writeln!(f, "  SNR               {:10.2} dB", s.snr_db)?;
        writeln!(f, "  Fading margin     {:10.2} dB", s.fading_margin_db)?;
        writeln!(f, "  Effective SNR     {:10.2} dB", s.effective_snr_db)?;
        writeln!(f, "  Required SNR      {:10.2} dB", s.required_snr_db)?;
        write!(
            f,
            "  Link margin       {:10.2} dB ({})",
            s.link_margin_db,
            if s.link_viable { "viable" } else { "not viable" }
        )
    }
}
