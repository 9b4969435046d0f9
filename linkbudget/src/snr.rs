//! Received power, SNR and link margin

use crate::results::{NoiseResults, PathLossResults, PolarizationResults, SnrResults};

/// Decode threshold used when none is configured (dB)
pub const DEFAULT_REQUIRED_SNR_DB: f64 = -30.2;

/// Extra margin for Earth-Moon distance changes during a sequence (dB)
const PATH_LENGTH_MARGIN_DB: f64 = 0.5;

pub fn dbm_to_watts(power_dbm: f64) -> f64 {
    10f64.powf((power_dbm - 30.0) / 10.0)
}

pub fn watts_to_dbm(power_w: f64) -> f64 {
    10.0 * (power_w * 1000.0).log10()
}

/// Libration fading allowance
pub struct FadingMargin;

impl FadingMargin {
    /// Depth of libration fading by band; diffuse scattering grows with frequency
    pub fn libration_fading_db(frequency_mhz: f64) -> f64 {
        if frequency_mhz < 200.0 {
            2.5
        } else if frequency_mhz < 500.0 {
            3.0
        } else if frequency_mhz < 1500.0 {
            3.5
        } else if frequency_mhz < 5000.0 {
            4.5
        } else {
            5.5
        }
    }

    /// Base fading margin in dB
    pub fn margin(frequency_mhz: f64) -> f64 {
        Self::libration_fading_db(frequency_mhz) + PATH_LENGTH_MARGIN_DB
    }

    /// Fading margin adjusted for a reliability target in percent
    pub fn recommended(frequency_mhz: f64, reliability_percent: f64) -> f64 {
        let adjustment = if reliability_percent >= 99.0 {
            2.0
        } else if reliability_percent >= 95.0 {
            1.0
        } else if reliability_percent >= 90.0 {
            0.0
        } else {
            -1.0
        };
        Self::margin(frequency_mhz) + adjustment
    }
}

/// Transmit power and the gains/losses either side of the path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmitChain {
    pub tx_power_dbm: f64,
    pub tx_gain_dbi: f64,
    pub rx_gain_dbi: f64,
    pub tx_feedline_loss_db: f64,
    pub rx_feedline_loss_db: f64,
}

impl TransmitChain {
    /// Received power in dBm after `total_loss_db` of propagation loss
    pub fn received_power_dbm(&self, total_loss_db: f64) -> f64 {
        self.tx_power_dbm + self.tx_gain_dbi + self.rx_gain_dbi
            - self.tx_feedline_loss_db
            - self.rx_feedline_loss_db
            - total_loss_db
    }
}

#[derive(Debug, Default, Clone)]
pub struct SnrEngine;

impl SnrEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(
        &self,
        chain: &TransmitChain,
        path_loss: &PathLossResults,
        polarization: &PolarizationResults,
        noise: &NoiseResults,
        required_snr_db: f64,
        fading_margin_db: f64,
    ) -> SnrResults {
        let total_loss = path_loss.total_path_loss_db + polarization.polarization_loss_db;
        let received = chain.received_power_dbm(total_loss);
        let snr = received - noise.noise_power_dbm;
        let effective = snr - fading_margin_db;
        let margin = effective - required_snr_db;

        SnrResults {
            received_signal_power_dbm: received,
            received_signal_power_w: dbm_to_watts(received),
            snr_db: snr,
            fading_margin_db,
            effective_snr_db: effective,
            required_snr_db,
            link_margin_db: margin,
            link_viable: margin > 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn chain() -> TransmitChain {
        TransmitChain {
            tx_power_dbm: 50.0,
            tx_gain_dbi: 20.0,
            rx_gain_dbi: 20.0,
            tx_feedline_loss_db: 0.5,
            rx_feedline_loss_db: 0.5,
        }
    }

    #[test]
    fn test_power_conversions() {
        assert!(approx(dbm_to_watts(30.0), 1.0, 1e-12));
        assert!(approx(dbm_to_watts(0.0), 1e-3, 1e-15));
        assert!(approx(watts_to_dbm(1.0), 30.0, 1e-12));
        assert!(approx(watts_to_dbm(dbm_to_watts(-163.0)), -163.0, 1e-9));
    }

    #[test]
    fn test_fading_margin_bands() {
        assert_eq!(FadingMargin::margin(50.0), 3.0);
        assert_eq!(FadingMargin::margin(144.0), 3.0);
        assert_eq!(FadingMargin::margin(432.0), 3.5);
        assert_eq!(FadingMargin::margin(1296.0), 4.0);
        assert_eq!(FadingMargin::margin(2304.0), 5.0);
        assert_eq!(FadingMargin::margin(10_368.0), 6.0);
    }

    #[test]
    fn test_recommended_margin() {
        assert_eq!(FadingMargin::recommended(144.0, 99.5), 5.0);
        assert_eq!(FadingMargin::recommended(144.0, 95.0), 4.0);
        assert_eq!(FadingMargin::recommended(144.0, 90.0), 3.0);
        assert_eq!(FadingMargin::recommended(144.0, 80.0), 2.0);
    }

    #[test]
    fn test_received_power_includes_polarization() {
        let path_loss = PathLossResults {
            total_path_loss_db: 252.0,
            ..Default::default()
        };
        let polarization = PolarizationResults {
            polarization_loss_db: 3.0,
            ..Default::default()
        };
        let noise = NoiseResults {
            noise_power_dbm: -130.0,
            ..Default::default()
        };

        let r = SnrEngine::new().calculate(&chain(), &path_loss, &polarization, &noise, -30.2, 3.0);
        assert!(approx(r.received_signal_power_dbm, -166.0, 1e-12));
        assert!(approx(r.snr_db, -36.0, 1e-12));
        assert!(approx(r.effective_snr_db, -39.0, 1e-12));
        assert!(approx(r.link_margin_db, -8.8, 1e-9));
        assert!(!r.link_viable);
        assert!(approx(r.received_signal_power_w, dbm_to_watts(-166.0), 1e-30));
    }

    #[test]
    fn test_viability_is_strict() {
        let path_loss = PathLossResults {
            total_path_loss_db: 250.0,
            ..Default::default()
        };
        let polarization = PolarizationResults::default();
        // received -161, noise chosen so effective SNR lands exactly on the threshold
        let noise = NoiseResults {
            noise_power_dbm: -128.0,
            ..Default::default()
        };

        let at_threshold =
            SnrEngine::new().calculate(&chain(), &path_loss, &polarization, &noise, -35.0, 2.0);
        assert_eq!(at_threshold.link_margin_db, 0.0);
        assert!(!at_threshold.link_viable);

        let above =
            SnrEngine::new().calculate(&chain(), &path_loss, &polarization, &noise, -35.25, 2.0);
        assert!(above.link_margin_db > 0.0);
        assert!(above.link_viable);
    }
}
