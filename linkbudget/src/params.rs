//! Link budget input parameters
//!
//! Everything the calculator needs for one run: the two stations, the RF
//! chain, the Moon ephemeris, ionosphere data for the polarization service
//! and the feature toggles. Angles are radians unless a field name says
//! otherwise. All types deserialize from partial JSON, filling missing
//! fields from `Default`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LinkBudgetError, LinkBudgetResult};

/// Closest and farthest Earth-Moon distances in km
pub const MOON_PERIGEE_KM: f64 = 356_000.0;
pub const MOON_APOGEE_KM: f64 = 406_000.0;

/// Mean Earth-Moon distance in km
pub const MOON_MEAN_DISTANCE_KM: f64 = 384_400.0;

/// A ground station
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteParameters {
    /// Geodetic latitude (rad, north positive)
    pub latitude: f64,
    /// Longitude (rad, east positive)
    pub longitude: f64,
    /// Polarization orientation angle psi (rad)
    pub psi: f64,
    /// Polarization ellipticity angle chi (rad): 0 linear, +-pi/4 circular
    pub chi: f64,
    /// Maidenhead locator, informational
    pub grid_locator: String,
    pub callsign: String,
}

impl SiteParameters {
    /// Site at the given latitude/longitude in degrees, linear polarization
    pub fn from_degrees(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            latitude: latitude_deg.to_radians(),
            longitude: longitude_deg.to_radians(),
            ..Default::default()
        }
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude.to_degrees()
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude.to_degrees()
    }
}

/// Moon position and motion at the observation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoonEphemeris {
    /// Right ascension (rad)
    pub right_ascension: f64,
    /// Declination (rad)
    pub declination: f64,
    /// Geocentric distance (km)
    pub distance_km: f64,
    /// Hour angle at the TX site (rad). Both zero means "compute from time".
    pub hour_angle_tx: f64,
    /// Hour angle at the RX site (rad)
    pub hour_angle_rx: f64,
    /// Range rate (km/s, positive receding)
    pub range_rate_km_s: f64,
    /// Libration rate in longitude (deg/day)
    pub libration_lon_rate_deg_day: f64,
    /// Libration rate in latitude (deg/day)
    pub libration_lat_rate_deg_day: f64,
    /// Where the ephemeris came from
    pub source: String,
}

impl Default for MoonEphemeris {
    fn default() -> Self {
        Self {
            right_ascension: 0.0,
            declination: 0.0,
            distance_km: MOON_MEAN_DISTANCE_KM,
            hour_angle_tx: 0.0,
            hour_angle_rx: 0.0,
            range_rate_km_s: 0.0,
            libration_lon_rate_deg_day: 0.0,
            libration_lat_rate_deg_day: 0.0,
            source: "Manual".to_string(),
        }
    }
}

impl MoonEphemeris {
    /// Hour angles were supplied by the ephemeris source
    pub fn has_hour_angles(&self) -> bool {
        !(self.hour_angle_tx == 0.0 && self.hour_angle_rx == 0.0)
    }

    pub fn has_libration(&self) -> bool {
        self.libration_lon_rate_deg_day != 0.0 || self.libration_lat_rate_deg_day != 0.0
    }

    /// Distance lies between perigee and apogee
    pub fn distance_is_plausible(&self) -> bool {
        (MOON_PERIGEE_KM..=MOON_APOGEE_KM).contains(&self.distance_km)
    }
}

/// Ionosphere and geomagnetic field per site, consumed by polarization services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IonosphereData {
    /// Vertical total electron content (TECU)
    pub vtec_tx: f64,
    pub vtec_rx: f64,
    /// F2 peak height (km)
    pub hmf2_tx: f64,
    pub hmf2_rx: f64,
    /// Geomagnetic field magnitude (T)
    pub b_magnitude_tx: f64,
    pub b_magnitude_rx: f64,
    /// Geomagnetic inclination (rad)
    pub b_inclination_tx: f64,
    pub b_inclination_rx: f64,
    /// Geomagnetic declination (rad)
    pub b_declination_tx: f64,
    pub b_declination_rx: f64,
    pub source: String,
}

impl Default for IonosphereData {
    fn default() -> Self {
        Self {
            vtec_tx: 0.0,
            vtec_rx: 0.0,
            hmf2_tx: 350.0,
            hmf2_rx: 350.0,
            b_magnitude_tx: 0.0,
            b_magnitude_rx: 0.0,
            b_inclination_tx: 0.0,
            b_inclination_rx: 0.0,
            b_declination_tx: 0.0,
            b_declination_rx: 0.0,
            source: "Manual".to_string(),
        }
    }
}

/// Optional data files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    /// Use the 408 MHz sky map instead of the analytic sky model
    pub use_sky_noise_map: bool,
    /// HEALPix FITS file holding the sky map
    pub sky_noise_map_path: Option<PathBuf>,
}

/// Complete configuration for one link budget run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkBudgetParameters {
    pub tx_site: SiteParameters,
    pub rx_site: SiteParameters,

    pub frequency_mhz: f64,
    pub bandwidth_hz: f64,
    pub tx_power_dbm: f64,
    pub tx_gain_dbi: f64,
    pub rx_gain_dbi: f64,
    pub tx_feedline_loss_db: f64,
    pub rx_feedline_loss_db: f64,

    pub rx_noise_figure_db: f64,
    /// Ambient temperature of ground and feedline (K)
    pub physical_temp_k: f64,

    pub observation_time: DateTime<Utc>,

    pub ionosphere: IonosphereData,
    pub moon_ephemeris: MoonEphemeris,
    pub data_sources: DataSourceConfig,

    pub include_faraday_rotation: bool,
    pub include_spatial_rotation: bool,
    pub include_moon_reflection: bool,
    pub include_atmospheric_loss: bool,
    pub include_ground_spillover: bool,
    pub use_hagfors_model: bool,

    /// Decode threshold of the digital mode in use (dB)
    pub required_snr_db: f64,
    /// Target link reliability; `None` uses the base fading margin
    pub reliability_percent: Option<f64>,
}

impl Default for LinkBudgetParameters {
    fn default() -> Self {
        Self {
            tx_site: SiteParameters::default(),
            rx_site: SiteParameters::default(),
            frequency_mhz: 144.0,
            bandwidth_hz: 2500.0,
            tx_power_dbm: 50.0,
            tx_gain_dbi: 20.0,
            rx_gain_dbi: 20.0,
            tx_feedline_loss_db: 0.5,
            rx_feedline_loss_db: 0.5,
            rx_noise_figure_db: 0.5,
            physical_temp_k: 290.0,
            observation_time: DateTime::<Utc>::default(),
            ionosphere: IonosphereData::default(),
            moon_ephemeris: MoonEphemeris::default(),
            data_sources: DataSourceConfig::default(),
            include_faraday_rotation: true,
            include_spatial_rotation: true,
            include_moon_reflection: true,
            include_atmospheric_loss: true,
            include_ground_spillover: true,
            use_hagfors_model: true,
            required_snr_db: crate::snr::DEFAULT_REQUIRED_SNR_DB,
            reliability_percent: None,
        }
    }
}

impl LinkBudgetParameters {
    /// Parse parameters from a JSON document
    pub fn from_json(json: &str) -> LinkBudgetResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read parameters from a JSON file
    pub fn load(path: impl AsRef<Path>) -> LinkBudgetResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check every RF parameter against its accepted range
    ///
    /// All violations are reported together. The comparisons are written so
    /// that NaN fails them.
    pub fn validate(&self) -> LinkBudgetResult<()> {
        let mut problems = Vec::new();

        if !(self.frequency_mhz > 0.0) {
            problems.push(format!("Invalid frequency: {} MHz.", self.frequency_mhz));
        }
        if !(self.bandwidth_hz > 0.0) {
            problems.push(format!("Invalid bandwidth: {} Hz.", self.bandwidth_hz));
        }
        if !(-50.0..=100.0).contains(&self.tx_power_dbm) {
            problems.push(format!(
                "TX power out of reasonable range: {} dBm.",
                self.tx_power_dbm
            ));
        }
        if !(0.0..=50.0).contains(&self.tx_gain_dbi) {
            problems.push(format!(
                "TX gain out of reasonable range: {} dBi.",
                self.tx_gain_dbi
            ));
        }
        if !(0.0..=50.0).contains(&self.rx_gain_dbi) {
            problems.push(format!(
                "RX gain out of reasonable range: {} dBi.",
                self.rx_gain_dbi
            ));
        }
        if !(0.0..=10.0).contains(&self.rx_noise_figure_db) {
            problems.push(format!(
                "RX noise figure out of reasonable range: {} dB.",
                self.rx_noise_figure_db
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(LinkBudgetError::InvalidConfiguration(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = LinkBudgetParameters::default();
        assert_eq!(params.frequency_mhz, 144.0);
        assert_eq!(params.bandwidth_hz, 2500.0);
        assert_eq!(params.physical_temp_k, 290.0);
        assert_eq!(params.required_snr_db, -30.2);
        assert_eq!(params.moon_ephemeris.distance_km, 384_400.0);
        assert!(params.use_hagfors_model);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let params = LinkBudgetParameters::from_json(
            r#"{ "frequency_mhz": 432.0, "rx_site": { "callsign": "K1JT" } }"#,
        )
        .unwrap();
        assert_eq!(params.frequency_mhz, 432.0);
        assert_eq!(params.rx_site.callsign, "K1JT");
        assert_eq!(params.tx_power_dbm, 50.0);
        assert_eq!(params.ionosphere.hmf2_tx, 350.0);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut params = LinkBudgetParameters::default();
        params.tx_site = SiteParameters::from_degrees(42.0, -71.0);
        params.reliability_percent = Some(95.0);
        let json = serde_json::to_string(&params).unwrap();
        let back = LinkBudgetParameters::from_json(&json).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = LinkBudgetParameters::from_json("{ not json").unwrap_err();
        assert!(matches!(err, LinkBudgetError::Config(_)));
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let params = LinkBudgetParameters {
            frequency_mhz: 0.0,
            bandwidth_hz: -1.0,
            tx_power_dbm: 120.0,
            tx_gain_dbi: -3.0,
            rx_gain_dbi: 55.0,
            rx_noise_figure_db: 11.0,
            ..Default::default()
        };
        match params.validate() {
            Err(LinkBudgetError::InvalidConfiguration(problems)) => {
                assert_eq!(problems.len(), 6);
                assert_eq!(problems[0], "Invalid frequency: 0 MHz.");
                assert_eq!(problems[1], "Invalid bandwidth: -1 Hz.");
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_boundaries_are_inclusive() {
        let params = LinkBudgetParameters {
            tx_power_dbm: 100.0,
            tx_gain_dbi: 0.0,
            rx_gain_dbi: 50.0,
            rx_noise_figure_db: 10.0,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_nan_frequency_rejected() {
        let params = LinkBudgetParameters {
            frequency_mhz: f64::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_ephemeris_helpers() {
        let mut moon = MoonEphemeris::default();
        assert!(!moon.has_hour_angles());
        assert!(!moon.has_libration());
        assert!(moon.distance_is_plausible());

        moon.hour_angle_rx = 0.1;
        moon.libration_lat_rate_deg_day = 0.2;
        moon.distance_km = 420_000.0;
        assert!(moon.has_hour_angles());
        assert!(moon.has_libration());
        assert!(!moon.distance_is_plausible());
    }
}
