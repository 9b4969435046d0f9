//! Moon geometry
//!
//! Topocentric azimuth and elevation of the Moon at each station from the
//! ephemeris, plus the Doppler spread caused by lunar libration.
//!
//! Station-to-Moon distance is taken as the geocentric distance. The
//! parallax error (an Earth radius against ~384,000 km) is ignored.

use chrono::{DateTime, Utc};

use crate::params::{MoonEphemeris, SiteParameters};
use crate::results::GeometryResults;
use crate::{MOON_RADIUS_KM, SPEED_OF_LIGHT_KM_S, SPEED_OF_LIGHT_M_S};

/// Julian date of the Unix epoch
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Julian date of J2000.0
const J2000_JD: f64 = 2_451_545.0;

/// Coherent integration ceiling when libration spread is negligible (s)
pub const MAX_COHERENT_INTEGRATION_S: f64 = 50.0;

/// Spread below which the coherent integration ceiling applies (Hz)
const MIN_SPREAD_HZ: f64 = 0.01;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Libration-induced Doppler spreading of the echo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadingResult {
    pub moon_angular_radius_deg: f64,
    pub libration_velocity_m_s: f64,
    pub doppler_spread_hz: f64,
    pub coherent_integration_limit_s: f64,
}

/// Julian date for a UTC instant
pub fn julian_date(time: &DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 * 1e-9;
    UNIX_EPOCH_JD + seconds / SECONDS_PER_DAY
}

/// Greenwich mean sidereal time in degrees, in [0, 360)
pub fn greenwich_mean_sidereal_time_deg(jd: f64) -> f64 {
    let days = jd - J2000_JD;
    let t = days / 36525.0;
    let gmst = 280.460_618_37 + 360.985_647_366_29 * days + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    gmst.rem_euclid(360.0)
}

/// Hour angle of an object in radians, in (-pi, pi]
///
/// `longitude` and `right_ascension` are radians, east longitude positive.
pub fn hour_angle(longitude: f64, right_ascension: f64, time: &DateTime<Utc>) -> f64 {
    let gmst = greenwich_mean_sidereal_time_deg(julian_date(time));
    let lst = (gmst + longitude.to_degrees()).rem_euclid(360.0);
    normalize_deg(lst - right_ascension.to_degrees()).to_radians()
}

/// Fold an angle in degrees into (-180, 180]
fn normalize_deg(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Azimuth and elevation in radians for a site at `latitude`
///
/// Azimuth is in [0, 2*pi).
pub fn moon_position(latitude: f64, declination: f64, hour_angle: f64) -> (f64, f64) {
    let (sin_lat, cos_lat) = latitude.sin_cos();
    let (sin_dec, cos_dec) = declination.sin_cos();
    let (sin_h, cos_h) = hour_angle.sin_cos();

    let elevation = (sin_lat * sin_dec + cos_lat * cos_dec * cos_h).asin();
    let azimuth = sin_h.atan2(cos_h * sin_lat - declination.tan() * cos_lat);

    (azimuth.rem_euclid(2.0 * std::f64::consts::PI), elevation)
}

/// Doppler spread of the echo from libration rates in deg/day
pub fn spectral_spreading(
    frequency_mhz: f64,
    moon_distance_km: f64,
    libration_lon_rate_deg_day: f64,
    libration_lat_rate_deg_day: f64,
) -> SpreadingResult {
    let angular_radius = MOON_RADIUS_KM.atan2(moon_distance_km);

    let lon_rate = libration_lon_rate_deg_day.to_radians() / SECONDS_PER_DAY;
    let lat_rate = libration_lat_rate_deg_day.to_radians() / SECONDS_PER_DAY;
    let rate = lon_rate.hypot(lat_rate);

    let velocity = rate * MOON_RADIUS_KM * 1000.0;
    let wavelength = SPEED_OF_LIGHT_M_S / (frequency_mhz * 1e6);
    let max_doppler = 2.0 * velocity / wavelength;
    let spread = max_doppler * angular_radius.sin();

    let limit = if spread > MIN_SPREAD_HZ {
        1.0 / (2.0 * spread)
    } else {
        MAX_COHERENT_INTEGRATION_S
    };

    SpreadingResult {
        moon_angular_radius_deg: angular_radius.to_degrees(),
        libration_velocity_m_s: velocity,
        doppler_spread_hz: spread,
        coherent_integration_limit_s: limit,
    }
}

/// Doppler shift in Hz for radial velocities (km/s, positive receding)
pub fn doppler_shift_hz(frequency_mhz: f64, velocity_tx_km_s: f64, velocity_rx_km_s: f64) -> f64 {
    -frequency_mhz * 1e6 * (velocity_tx_km_s + velocity_rx_km_s) / SPEED_OF_LIGHT_KM_S
}

/// Computes Moon pointing for both stations
#[derive(Debug, Default, Clone)]
pub struct GeometryEngine;

impl GeometryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(
        &self,
        tx: &SiteParameters,
        rx: &SiteParameters,
        moon: &MoonEphemeris,
        time: &DateTime<Utc>,
        frequency_mhz: f64,
    ) -> GeometryResults {
        let (hour_angle_tx, hour_angle_rx) = if moon.has_hour_angles() {
            (moon.hour_angle_tx, moon.hour_angle_rx)
        } else {
            tracing::debug!("Hour angles not supplied, computing from sidereal time at {}", time);
            (
                hour_angle(tx.longitude, moon.right_ascension, time),
                hour_angle(rx.longitude, moon.right_ascension, time),
            )
        };

        if !moon.distance_is_plausible() {
            tracing::warn!(
                "Moon distance {:.0} km is outside perigee/apogee range",
                moon.distance_km
            );
        }

        let (az_tx, el_tx) = moon_position(tx.latitude, moon.declination, hour_angle_tx);
        let (az_rx, el_rx) = moon_position(rx.latitude, moon.declination, hour_angle_rx);

        let mut results = GeometryResults {
            distance_tx_km: moon.distance_km,
            distance_rx_km: moon.distance_km,
            total_path_length_km: 2.0 * moon.distance_km,
            doppler_shift_hz: 0.0,
            moon_ra_deg: moon.right_ascension.to_degrees(),
            moon_dec_deg: moon.declination.to_degrees(),
            moon_azimuth_tx_deg: az_tx.to_degrees(),
            moon_elevation_tx_deg: el_tx.to_degrees(),
            moon_azimuth_rx_deg: az_rx.to_degrees(),
            moon_elevation_rx_deg: el_rx.to_degrees(),
            moon_distance_km: moon.distance_km,
            hour_angle_tx_rad: hour_angle_tx,
            hour_angle_rx_rad: hour_angle_rx,
            ephemeris_source: moon.source.clone(),
            ..Default::default()
        };

        if moon.has_libration() {
            let spreading = spectral_spreading(
                frequency_mhz,
                moon.distance_km,
                moon.libration_lon_rate_deg_day,
                moon.libration_lat_rate_deg_day,
            );
            results.spectral_spread_hz = Some(spreading.doppler_spread_hz);
            results.coherent_integration_limit_s = Some(spreading.coherent_integration_limit_s);
            results.libration_velocity_m_s = Some(spreading.libration_velocity_m_s);
        }

        results
    }
}
